// SPDX-License-Identifier: MIT OR Apache-2.0

use super::sink_trait::MatchSink;
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::ComplexEvent;
use std::sync::{Arc, Mutex, PoisonError};

/// Debug sink that logs every match as JSON at info level and keeps a copy
#[derive(Debug, Clone)]
pub struct LogSink {
    pub events: Arc<Mutex<Vec<ComplexEvent>>>,
    prefix: String,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink {
    pub fn new() -> Self {
        Self::with_prefix("[MATCH]")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            prefix: prefix.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MatchSink for LogSink {
    fn publish(&self, event: &ComplexEvent) -> EventFluxResult<()> {
        let json = event
            .to_json()
            .map_err(|e| EventFluxError::other(format!("LogSink serialization failed: {}", e)))?;
        log::info!("{} {}", self.prefix, json);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
