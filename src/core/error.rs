// SPDX-License-Identifier: MIT OR Apache-2.0

//! EventFlux Core Error Types
//!
//! Runtime errors of the tuple store and query runtime, plus wrapped compile,
//! catalog and wire errors so callers can use one `?` chain end to end.

use crate::core::stream::tuple::schema::SchemaId;
use crate::query_api::wire::WireError;
use crate::sql_compiler::error::{CatalogError, CompileError};
use thiserror::Error;

/// Result type for EventFlux operations
pub type EventFluxResult<T> = Result<T, EventFluxError>;

#[derive(Error, Debug)]
pub enum EventFluxError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },

    #[error("Tuple at position {position} was reclaimed (oldest retained: {oldest_retained})")]
    StaleReference { position: u64, oldest_retained: u64 },

    #[error("Tuple at position {position} has not been written yet (head: {head})")]
    TupleNotWritten { position: u64, head: u64 },

    #[error("Store full: appending position {position} would reclaim a slot pinned at {pinned}")]
    Backpressure { position: u64, pinned: u64 },

    #[error("Schema {schema_id} mismatch: {message}")]
    SchemaMismatch { schema_id: SchemaId, message: String },

    #[error("Unknown schema id {0}")]
    UnknownSchema(SchemaId),

    #[error("Timestamp {timestamp} is older than the last appended timestamp {last}")]
    OutOfOrderTimestamp { timestamp: i64, last: i64 },

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// Custom error creation helpers
impl EventFluxError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: None,
        }
    }

    /// Create a configuration error with a specific key
    pub fn configuration_with_key(message: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    pub fn schema_mismatch(schema_id: SchemaId, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            schema_id,
            message: message.into(),
        }
    }

    /// Create a generic error from a string
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// True when the error means the referenced tuple is gone for good
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }
}
