// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scalar expressions over the attributes of a single event

pub mod indexed_variable;

pub use indexed_variable::{EventIndex, IndexedVariable};

use crate::core::event::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
}

impl MathOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Subtract => "-",
            MathOp::Multiply => "*",
            MathOp::Divide => "/",
            MathOp::Mod => "%",
        }
    }
}

/// Scalar expression tree
///
/// Attribute references are by name here; the compiler resolves them to field
/// indexes against one concrete event schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Variable(String),
    Constant(AttributeValue),
    Math {
        op: MathOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn constant(value: impl Into<AttributeValue>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn math(op: MathOp, left: Expression, right: Expression) -> Self {
        Expression::Math {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn add(left: Expression, right: Expression) -> Self {
        Self::math(MathOp::Add, left, right)
    }

    pub fn subtract(left: Expression, right: Expression) -> Self {
        Self::math(MathOp::Subtract, left, right)
    }

    pub fn multiply(left: Expression, right: Expression) -> Self {
        Self::math(MathOp::Multiply, left, right)
    }

    pub fn divide(left: Expression, right: Expression) -> Self {
        Self::math(MathOp::Divide, left, right)
    }

    pub fn modulo(left: Expression, right: Expression) -> Self {
        Self::math(MathOp::Mod, left, right)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Variable(name) => f.write_str(name),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Math { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}
