// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boolean predicates over a single event
//!
//! The grammar is closed under negation: every `Not` can be pushed down to the
//! leaves by De Morgan, operator flipping and the `negated` flags of `LIKE` /
//! `IN`. Compiled predicates therefore never carry a runtime negation node.

use crate::core::event::value::AttributeValue;
use crate::query_api::expression::Expression;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Equal,
    NotEqual,
}

impl CompareOp {
    /// The operator whose result is the logical complement of this one
    pub fn negate(self) -> Self {
        match self {
            CompareOp::LessThan => CompareOp::GreaterThanEqual,
            CompareOp::LessThanEqual => CompareOp::GreaterThan,
            CompareOp::GreaterThan => CompareOp::LessThanEqual,
            CompareOp::GreaterThanEqual => CompareOp::LessThan,
            CompareOp::Equal => CompareOp::NotEqual,
            CompareOp::NotEqual => CompareOp::Equal,
        }
    }

    /// Apply the operator to the result of `left.partial_cmp(right)`
    ///
    /// Unordered operands (NaN) only satisfy `!=`.
    #[inline]
    pub fn matches(self, ordering: Option<Ordering>) -> bool {
        match ordering {
            None => self == CompareOp::NotEqual,
            Some(ord) => match self {
                CompareOp::LessThan => ord == Ordering::Less,
                CompareOp::LessThanEqual => ord != Ordering::Greater,
                CompareOp::GreaterThan => ord == Ordering::Greater,
                CompareOp::GreaterThanEqual => ord != Ordering::Less,
                CompareOp::Equal => ord == Ordering::Equal,
                CompareOp::NotEqual => ord != Ordering::Equal,
            },
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Equal | CompareOp::NotEqual)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::LessThan => "<",
            CompareOp::LessThanEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanEqual => ">=",
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
        }
    }
}

/// Predicate tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Compare {
        left: Expression,
        op: CompareOp,
        right: Expression,
    },
    /// SQL `LIKE` with `%` and `_` wildcards, `\` escapes the next character
    Like {
        attribute: String,
        pattern: String,
        negated: bool,
    },
    In {
        attribute: String,
        values: Vec<AttributeValue>,
        negated: bool,
    },
    Constant(bool),
}

impl Predicate {
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    pub fn compare(left: Expression, op: CompareOp, right: Expression) -> Self {
        Predicate::Compare { left, op, right }
    }

    pub fn like(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            attribute: attribute.into(),
            pattern: pattern.into(),
            negated: false,
        }
    }

    pub fn in_set(attribute: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Predicate::In {
            attribute: attribute.into(),
            values,
            negated: false,
        }
    }

    /// Logical complement, expressed without a `Not` at the root
    ///
    /// The result is `Not`-free whenever the input is.
    pub fn negate(self) -> Predicate {
        match self {
            Predicate::And(l, r) => Predicate::or(l.negate(), r.negate()),
            Predicate::Or(l, r) => Predicate::and(l.negate(), r.negate()),
            Predicate::Not(inner) => inner.push_negations(),
            Predicate::Compare { left, op, right } => Predicate::Compare {
                left,
                op: op.negate(),
                right,
            },
            Predicate::Like {
                attribute,
                pattern,
                negated,
            } => Predicate::Like {
                attribute,
                pattern,
                negated: !negated,
            },
            Predicate::In {
                attribute,
                values,
                negated,
            } => Predicate::In {
                attribute,
                values,
                negated: !negated,
            },
            Predicate::Constant(b) => Predicate::Constant(!b),
        }
    }

    /// Rewrite into an equivalent tree without `Not` nodes
    pub fn push_negations(self) -> Predicate {
        match self {
            Predicate::And(l, r) => Predicate::and(l.push_negations(), r.push_negations()),
            Predicate::Or(l, r) => Predicate::or(l.push_negations(), r.push_negations()),
            Predicate::Not(inner) => inner.push_negations().negate(),
            leaf => leaf,
        }
    }

    pub fn contains_negation(&self) -> bool {
        match self {
            Predicate::Not(_) => true,
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.contains_negation() || r.contains_negation()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(l, r) => write!(f, "({} AND {})", l, r),
            Predicate::Or(l, r) => write!(f, "({} OR {})", l, r),
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
            Predicate::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Predicate::Like {
                attribute,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE '{}'", attribute, not, pattern)
            }
            Predicate::In {
                attribute,
                values,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} {}IN ({})", attribute, not, items.join(", "))
            }
            Predicate::Constant(b) => write!(f, "{}", b),
        }
    }
}
