// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled single-event predicates
//!
//! Negations are pushed to the leaves before compilation, so the executor tree
//! has no `Not` node: `NOT (a AND b)` runs as `a' OR b'` with flipped leaves.

pub mod like;

use crate::core::event::value::AttributeValue;
use crate::core::executor::expression_executor::{EvalError, ScalarExecutor};
use crate::core::stream::tuple::TupleView;
use crate::query_api::definition::attribute::Type as AttributeType;
use crate::query_api::pattern::{CompareOp, Predicate};
use crate::sql_compiler::catalog::EventTypeInfo;
use crate::sql_compiler::error::CompileError;
use crate::sql_compiler::type_inference::{attribute_type, comparison_kind, ComparisonKind};
use regex::Regex;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub enum PredicateExecutor {
    And(Box<PredicateExecutor>, Box<PredicateExecutor>),
    Or(Box<PredicateExecutor>, Box<PredicateExecutor>),
    Compare {
        left: ScalarExecutor,
        op: CompareOp,
        right: ScalarExecutor,
        kind: ComparisonKind,
    },
    Like {
        index: usize,
        regex: Regex,
        negated: bool,
    },
    In {
        index: usize,
        values: Vec<AttributeValue>,
        negated: bool,
    },
    Constant(bool),
}

impl PredicateExecutor {
    /// Compile a predicate against one event type
    pub fn compile(predicate: &Predicate, event_type: &EventTypeInfo) -> Result<Self, CompileError> {
        Self::compile_pushed(&predicate.clone().push_negations(), event_type)
    }

    fn compile_pushed(predicate: &Predicate, event_type: &EventTypeInfo) -> Result<Self, CompileError> {
        match predicate {
            Predicate::And(l, r) => Ok(PredicateExecutor::And(
                Box::new(Self::compile_pushed(l, event_type)?),
                Box::new(Self::compile_pushed(r, event_type)?),
            )),
            Predicate::Or(l, r) => Ok(PredicateExecutor::Or(
                Box::new(Self::compile_pushed(l, event_type)?),
                Box::new(Self::compile_pushed(r, event_type)?),
            )),
            Predicate::Not(inner) => Self::compile_pushed(&inner.clone().negate(), event_type),
            Predicate::Compare { left, op, right } => {
                let left = ScalarExecutor::compile(left, event_type)?;
                let right = ScalarExecutor::compile(right, event_type)?;
                let kind = comparison_kind(left.return_type(), *op, right.return_type())?;
                Ok(PredicateExecutor::Compare {
                    left,
                    op: *op,
                    right,
                    kind,
                })
            }
            Predicate::Like {
                attribute,
                pattern,
                negated,
            } => {
                let ty = attribute_type(event_type, attribute)?;
                if ty != AttributeType::STRING {
                    return Err(CompileError::type_mismatch(format!(
                        "LIKE requires a STRING attribute, '{}' is {}",
                        attribute, ty
                    )));
                }
                Ok(PredicateExecutor::Like {
                    index: Self::index_of(event_type, attribute)?,
                    regex: like::like_to_regex(pattern)?,
                    negated: *negated,
                })
            }
            Predicate::In {
                attribute,
                values,
                negated,
            } => {
                let ty = attribute_type(event_type, attribute)?;
                for value in values {
                    comparison_kind(ty, CompareOp::Equal, value.get_type()).map_err(|_| {
                        CompileError::type_mismatch(format!(
                            "IN list value {} is not comparable with {} attribute '{}'",
                            value, ty, attribute
                        ))
                    })?;
                }
                Ok(PredicateExecutor::In {
                    index: Self::index_of(event_type, attribute)?,
                    values: values.clone(),
                    negated: *negated,
                })
            }
            Predicate::Constant(b) => Ok(PredicateExecutor::Constant(*b)),
        }
    }

    fn index_of(event_type: &EventTypeInfo, attribute: &str) -> Result<usize, CompileError> {
        event_type
            .attribute_index(attribute)
            .ok_or_else(|| CompileError::unknown_attribute(&event_type.name, attribute))
    }

    pub fn execute(&self, tuple: &TupleView) -> Result<bool, EvalError> {
        match self {
            PredicateExecutor::And(l, r) => Ok(l.execute(tuple)? && r.execute(tuple)?),
            PredicateExecutor::Or(l, r) => Ok(l.execute(tuple)? || r.execute(tuple)?),
            PredicateExecutor::Compare {
                left, op, right, ..
            } => {
                let l = left.eval(tuple)?;
                let r = right.eval(tuple)?;
                Ok(op.matches(compare_values(&l, &r)))
            }
            PredicateExecutor::Like {
                index,
                regex,
                negated,
            } => {
                let text = tuple.get_str(*index).ok_or(EvalError::MissingField(*index))?;
                Ok(regex.is_match(text) != *negated)
            }
            PredicateExecutor::In {
                index,
                values,
                negated,
            } => {
                let value = tuple.get_value(*index).ok_or(EvalError::MissingField(*index))?;
                let found = values
                    .iter()
                    .any(|v| compare_values(&value, v) == Some(Ordering::Equal));
                Ok(found != *negated)
            }
            PredicateExecutor::Constant(b) => Ok(*b),
        }
    }
}

/// Order two values of comparable types; `None` for NaN or incomparable types
pub fn compare_values(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::Long(a), AttributeValue::Long(b)) => Some(a.cmp(b)),
        (AttributeValue::String(a), AttributeValue::String(b)) => Some(a.cmp(b)),
        (AttributeValue::Bool(a), AttributeValue::Bool(b)) => Some(a.cmp(b)),
        (AttributeValue::DateTime(a), AttributeValue::DateTime(b)) => Some(a.cmp(b)),
        (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}
