// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog and query compilation errors

use crate::query_api::definition::attribute::Type;
use thiserror::Error;

/// Errors raised while registering or looking up catalog entries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Event type '{0}' is already registered")]
    DuplicateEventType(String),

    #[error("Stream '{0}' is already registered")]
    DuplicateStream(String),

    #[error("Attribute '{attribute}' is declared twice in event type '{event_type}'")]
    DuplicateAttribute {
        event_type: String,
        attribute: String,
    },

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("Event type '{event_type}' has no attribute '{attribute}'")]
    UnknownAttribute {
        event_type: String,
        attribute: String,
    },
}

/// Errors raised while compiling a query; always reported before any tuple is processed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Event type '{event_type}' has no attribute '{attribute}'")]
    UnknownAttribute {
        event_type: String,
        attribute: String,
    },

    #[error("Variable '{0}' does not name an event type or role of the pattern")]
    UnknownVariable(String),

    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },

    #[error("Attribute '{attribute}' of event type '{event_type}' has unsupported type {attribute_type}")]
    UnsupportedFieldType {
        event_type: String,
        attribute: String,
        attribute_type: Type,
    },

    #[error("Invalid LIKE pattern '{pattern}': {message}")]
    InvalidLikePattern { pattern: String, message: String },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Automaton too large: {message}")]
    AutomatonTooLarge { message: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl CompileError {
    pub fn unknown_attribute(event_type: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            event_type: event_type.into(),
            attribute: attribute.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn invalid_like_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidLikePattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn automaton_too_large(message: impl Into<String>) -> Self {
        Self::AutomatonTooLarge {
            message: message.into(),
        }
    }
}
