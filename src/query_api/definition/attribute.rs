// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute types known to the catalog
///
/// `OBJECT` can be declared but has no packed tuple representation; queries
/// touching such an event type fail to compile.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    LONG,
    DOUBLE,
    BOOL,
    STRING,
    DATETIME,
    OBJECT,
}

impl Type {
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::LONG | Type::DOUBLE)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Type::LONG => "LONG",
            Type::DOUBLE => "DOUBLE",
            Type::BOOL => "BOOL",
            Type::STRING => "STRING",
            Type::DATETIME => "DATETIME",
            Type::OBJECT => "OBJECT",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed attribute of an event type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: Type,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attribute_type: Type) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}
