// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scalar Expression Executor
//!
//! Attribute references are resolved to field indexes and return types are
//! inferred once at compile time; evaluation reads the packed tuple directly.

use crate::core::event::value::AttributeValue;
use crate::core::stream::tuple::TupleView;
use crate::query_api::definition::attribute::Type as AttributeType;
use crate::query_api::expression::{Expression, MathOp};
use crate::sql_compiler::catalog::EventTypeInfo;
use crate::sql_compiler::error::CompileError;
use crate::sql_compiler::type_inference::{attribute_type, infer_math_type};
use thiserror::Error;

/// Runtime evaluation faults; a predicate hitting one is treated as false
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Modulo by zero")]
    ModuloByZero,

    #[error("Integer overflow in '{0}'")]
    Overflow(&'static str),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Field {0} missing from tuple")]
    MissingField(usize),
}

/// Compiled scalar expression
#[derive(Debug, Clone)]
pub enum ScalarExecutor {
    Attribute {
        index: usize,
        return_type: AttributeType,
    },
    Constant(AttributeValue),
    Math {
        op: MathOp,
        left: Box<ScalarExecutor>,
        right: Box<ScalarExecutor>,
        return_type: AttributeType,
    },
}

impl ScalarExecutor {
    pub fn compile(expr: &Expression, event_type: &EventTypeInfo) -> Result<Self, CompileError> {
        match expr {
            Expression::Variable(name) => {
                let return_type = attribute_type(event_type, name)?;
                let index = event_type
                    .attribute_index(name)
                    .ok_or_else(|| CompileError::unknown_attribute(&event_type.name, name))?;
                Ok(ScalarExecutor::Attribute { index, return_type })
            }
            Expression::Constant(value) => Ok(ScalarExecutor::Constant(value.clone())),
            Expression::Math { op, left, right } => {
                let left = Self::compile(left, event_type)?;
                let right = Self::compile(right, event_type)?;
                let return_type = infer_math_type(*op, left.return_type(), right.return_type())?;
                Ok(ScalarExecutor::Math {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                    return_type,
                })
            }
        }
    }

    pub fn return_type(&self) -> AttributeType {
        match self {
            ScalarExecutor::Attribute { return_type, .. } => *return_type,
            ScalarExecutor::Constant(value) => value.get_type(),
            ScalarExecutor::Math { return_type, .. } => *return_type,
        }
    }

    pub fn eval(&self, tuple: &TupleView) -> Result<AttributeValue, EvalError> {
        match self {
            ScalarExecutor::Attribute { index, .. } => {
                tuple.get_value(*index).ok_or(EvalError::MissingField(*index))
            }
            ScalarExecutor::Constant(value) => Ok(value.clone()),
            ScalarExecutor::Math {
                op,
                left,
                right,
                return_type,
            } => {
                let l = left.eval(tuple)?;
                let r = right.eval(tuple)?;
                if *return_type == AttributeType::LONG {
                    match (l.as_i64(), r.as_i64()) {
                        (Some(a), Some(b)) => long_math(*op, a, b).map(AttributeValue::Long),
                        _ => Err(EvalError::TypeError(format!(
                            "expected LONG operands for '{}'",
                            op.symbol()
                        ))),
                    }
                } else {
                    match (l.as_f64(), r.as_f64()) {
                        (Some(a), Some(b)) => double_math(*op, a, b).map(AttributeValue::Double),
                        _ => Err(EvalError::TypeError(format!(
                            "expected numeric operands for '{}'",
                            op.symbol()
                        ))),
                    }
                }
            }
        }
    }
}

#[inline]
fn long_math(op: MathOp, a: i64, b: i64) -> Result<i64, EvalError> {
    match op {
        MathOp::Add => a.checked_add(b).ok_or(EvalError::Overflow("+")),
        MathOp::Subtract => a.checked_sub(b).ok_or(EvalError::Overflow("-")),
        MathOp::Multiply => a.checked_mul(b).ok_or(EvalError::Overflow("*")),
        MathOp::Divide if b == 0 => Err(EvalError::DivisionByZero),
        MathOp::Divide => a.checked_div(b).ok_or(EvalError::Overflow("/")),
        MathOp::Mod if b == 0 => Err(EvalError::ModuloByZero),
        MathOp::Mod => a.checked_rem(b).ok_or(EvalError::Overflow("%")),
    }
}

#[inline]
fn double_math(op: MathOp, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        MathOp::Add => Ok(a + b),
        MathOp::Subtract => Ok(a - b),
        MathOp::Multiply => Ok(a * b),
        MathOp::Divide if b == 0.0 => Err(EvalError::DivisionByZero),
        MathOp::Divide => Ok(a / b),
        MathOp::Mod if b == 0.0 => Err(EvalError::ModuloByZero),
        MathOp::Mod => Ok(a % b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_api::definition::EventDefinition;
    use crate::sql_compiler::catalog::{Catalog, CatalogLookup};
    use std::sync::Arc;

    fn fixture(count: i64, temp: f64) -> (Arc<EventTypeInfo>, TupleView) {
        let mut catalog = Catalog::new();
        catalog
            .register_event_type(
                EventDefinition::new("H")
                    .attribute("count", AttributeType::LONG)
                    .attribute("temp", AttributeType::DOUBLE),
            )
            .unwrap();
        let info = catalog.event_type("H").unwrap();
        let schema = info.schema.clone().unwrap();
        let data = schema.encode(0, 0, &[count.into(), temp.into()]).unwrap();
        (info, TupleView::from_encoded(0, schema, data.into()))
    }

    fn eval(expr: Expression, count: i64, temp: f64) -> Result<AttributeValue, EvalError> {
        let (info, view) = fixture(count, temp);
        ScalarExecutor::compile(&expr, &info).unwrap().eval(&view)
    }

    #[test]
    fn test_long_arithmetic_stays_long() {
        let expr = Expression::modulo(
            Expression::add(Expression::variable("count"), Expression::constant(4i64)),
            Expression::constant(5i64),
        );
        assert_eq!(eval(expr, 8, 0.0), Ok(AttributeValue::Long(2)));
    }

    #[test]
    fn test_mixed_arithmetic_widens() {
        let expr = Expression::divide(Expression::variable("count"), Expression::variable("temp"));
        assert_eq!(eval(expr, 3, 2.0), Ok(AttributeValue::Double(1.5)));
    }

    #[test]
    fn test_faults() {
        let div = Expression::divide(Expression::variable("count"), Expression::constant(0i64));
        assert_eq!(eval(div, 1, 0.0), Err(EvalError::DivisionByZero));
        let modulo = Expression::modulo(Expression::variable("temp"), Expression::constant(0.0));
        assert_eq!(eval(modulo, 1, 1.0), Err(EvalError::ModuloByZero));
        let overflow = Expression::add(Expression::variable("count"), Expression::constant(1i64));
        assert_eq!(eval(overflow, i64::MAX, 0.0), Err(EvalError::Overflow("+")));
    }

    #[test]
    fn test_unknown_attribute_is_compile_error() {
        let (info, _) = fixture(0, 0.0);
        assert!(matches!(
            ScalarExecutor::compile(&Expression::variable("nope"), &info),
            Err(CompileError::UnknownAttribute { .. })
        ));
    }
}
