// SPDX-License-Identifier: MIT OR Apache-2.0

//! Type Inference for pattern predicates
//!
//! Scalar expressions are typed against a single event type at compile time,
//! so every type error is reported before evaluation starts.

use crate::query_api::definition::attribute::Type as AttributeType;
use crate::query_api::expression::{Expression, MathOp};
use crate::query_api::pattern::CompareOp;
use crate::sql_compiler::catalog::EventTypeInfo;
use crate::sql_compiler::error::CompileError;

/// How two operands of a comparison are compared at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    Numeric,
    Text,
    Boolean,
    DateTime,
}

/// Type of an attribute reference, rejecting attributes without a tuple representation
pub fn attribute_type(event_type: &EventTypeInfo, attribute: &str) -> Result<AttributeType, CompileError> {
    let ty = event_type
        .attribute_type(attribute)
        .ok_or_else(|| CompileError::unknown_attribute(&event_type.name, attribute))?;
    if ty == AttributeType::OBJECT {
        return Err(CompileError::UnsupportedFieldType {
            event_type: event_type.name.clone(),
            attribute: attribute.to_string(),
            attribute_type: ty,
        });
    }
    Ok(ty)
}

/// Static return type of an expression evaluated against tuples of `event_type`
pub fn infer_expression_type(
    expr: &Expression,
    event_type: &EventTypeInfo,
) -> Result<AttributeType, CompileError> {
    match expr {
        Expression::Variable(name) => attribute_type(event_type, name),
        Expression::Constant(value) => Ok(value.get_type()),
        Expression::Math { op, left, right } => {
            let l = infer_expression_type(left, event_type)?;
            let r = infer_expression_type(right, event_type)?;
            infer_math_type(*op, l, r)
        }
    }
}

/// `LONG op LONG` stays `LONG`; any other numeric mix widens to `DOUBLE`
#[inline]
pub fn infer_math_type(
    op: MathOp,
    left: AttributeType,
    right: AttributeType,
) -> Result<AttributeType, CompileError> {
    if !left.is_numeric() || !right.is_numeric() {
        return Err(CompileError::type_mismatch(format!(
            "operator '{}' requires numeric operands, got {} and {}",
            op.symbol(),
            left,
            right
        )));
    }
    if left == AttributeType::LONG && right == AttributeType::LONG {
        Ok(AttributeType::LONG)
    } else {
        Ok(AttributeType::DOUBLE)
    }
}

/// Decide how `left op right` is evaluated, or reject the pair
pub fn comparison_kind(
    left: AttributeType,
    op: CompareOp,
    right: AttributeType,
) -> Result<ComparisonKind, CompileError> {
    let kind = match (left, right) {
        (l, r) if l.is_numeric() && r.is_numeric() => ComparisonKind::Numeric,
        (AttributeType::STRING, AttributeType::STRING) => ComparisonKind::Text,
        (AttributeType::DATETIME, AttributeType::DATETIME) => ComparisonKind::DateTime,
        (AttributeType::BOOL, AttributeType::BOOL) if op.is_equality() => ComparisonKind::Boolean,
        (AttributeType::BOOL, AttributeType::BOOL) => {
            return Err(CompileError::type_mismatch(format!(
                "BOOL values only support == and !=, got '{}'",
                op.symbol()
            )))
        }
        _ => {
            return Err(CompileError::type_mismatch(format!(
                "cannot compare {} {} {}",
                left,
                op.symbol(),
                right
            )))
        }
    };
    Ok(kind)
}
