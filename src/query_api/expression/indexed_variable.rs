// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexed variable access into the events bound to a pattern variable: x[0].attr, x[last].attr
//!
//! A variable is either an event type name or a role introduced with `AS`.
//! Iterations bind many events to one variable, so the index picks which one.
//!
//! # Examples
//!
//! ```ignore
//! // First H event's temperature: H[0].temp
//! let var = IndexedVariable::new_with_index("temp", 0).of_variable("H");
//!
//! // Last event bound to role `t`: t[last].value
//! let var = IndexedVariable::new_with_last("value").of_variable("t");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index specification for the events bound to a variable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventIndex {
    /// Numeric index (0-based): x[0] (first), x[1] (second), ...
    Numeric(usize),

    /// Special "last" keyword: x[last]
    Last,
}

impl EventIndex {
    /// Resolve index to concrete value given collection size
    /// Returns None if index is out of bounds
    pub fn resolve(&self, collection_size: usize) -> Option<usize> {
        if collection_size == 0 {
            return None;
        }

        match self {
            EventIndex::Numeric(idx) if *idx < collection_size => Some(*idx),
            EventIndex::Numeric(_) => None,
            EventIndex::Last => Some(collection_size - 1),
        }
    }
}

impl fmt::Display for EventIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventIndex::Numeric(idx) => write!(f, "{}", idx),
            EventIndex::Last => f.write_str("last"),
        }
    }
}

/// Indexed access to one attribute of one bound event: `variable[index].attribute_name`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedVariable {
    /// Event type name or role
    pub variable: String,

    pub index: EventIndex,

    pub attribute_name: String,
}

impl IndexedVariable {
    /// `?[index].attribute_name`; bind the variable with [`IndexedVariable::of_variable`]
    pub fn new_with_index(attribute_name: impl Into<String>, index: usize) -> Self {
        IndexedVariable {
            variable: String::new(),
            index: EventIndex::Numeric(index),
            attribute_name: attribute_name.into(),
        }
    }

    /// `?[last].attribute_name`
    pub fn new_with_last(attribute_name: impl Into<String>) -> Self {
        IndexedVariable {
            variable: String::new(),
            index: EventIndex::Last,
            attribute_name: attribute_name.into(),
        }
    }

    pub fn of_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }
}

impl fmt::Display for IndexedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}].{}", self.variable, self.index, self.attribute_name)
    }
}
