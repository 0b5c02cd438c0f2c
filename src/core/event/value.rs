// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::query_api::definition::attribute::Type;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete attribute value, as read from a tuple or written as a literal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Long(i64),
    Double(f64),
    Bool(bool),
    String(String),
    DateTime(DateTime<Utc>),
}

impl AttributeValue {
    pub fn get_type(&self) -> Type {
        match self {
            AttributeValue::Long(_) => Type::LONG,
            AttributeValue::Double(_) => Type::DOUBLE,
            AttributeValue::Bool(_) => Type::BOOL,
            AttributeValue::String(_) => Type::STRING,
            AttributeValue::DateTime(_) => Type::DATETIME,
        }
    }

    /// Numeric view used for mixed LONG/DOUBLE arithmetic and comparisons
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Long(v) => Some(*v as f64),
            AttributeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Milliseconds since the epoch, the packed representation of DATETIME
    pub fn datetime_from_millis(millis: i64) -> Option<AttributeValue> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(AttributeValue::DateTime)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Long(v) => write!(f, "{}", v),
            AttributeValue::Double(v) => write!(f, "{}", v),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::String(v) => write!(f, "'{}'", v),
            AttributeValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Long(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(v: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(v)
    }
}
