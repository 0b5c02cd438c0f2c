// SPDX-License-Identifier: MIT OR Apache-2.0

use super::sink_trait::MatchSink;
use crate::core::error::EventFluxResult;
use crate::core::event::complex_event::ComplexEvent;
use std::sync::{Mutex, PoisonError};

/// Keeps every published match in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ComplexEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far
    pub fn take(&self) -> Vec<ComplexEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn snapshot(&self) -> Vec<ComplexEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MatchSink for CollectingSink {
    fn publish(&self, event: &ComplexEvent) -> EventFluxResult<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
