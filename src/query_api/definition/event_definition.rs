// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event type and stream definitions, as produced by `CREATE EVENT` / `CREATE STREAM`

use super::attribute::{Attribute, Type};
use serde::{Deserialize, Serialize};

/// Definition of one event type: a name and its ordered attributes
///
/// Attribute order is significant: it becomes the field order of the packed
/// tuple schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl EventDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute append
    pub fn attribute(mut self, name: impl Into<String>, attribute_type: Type) -> Self {
        self.attributes.push(Attribute::new(name, attribute_type));
        self
    }
}

/// A named group of event types
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDefinition {
    pub name: String,
    pub event_types: Vec<String>,
}

impl StreamDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_types: Vec::new(),
        }
    }

    pub fn event_type(mut self, name: impl Into<String>) -> Self {
        self.event_types.push(name.into());
        self
    }
}
