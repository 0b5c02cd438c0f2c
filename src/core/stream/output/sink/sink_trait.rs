// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::core::error::EventFluxResult;
use crate::core::event::complex_event::ComplexEvent;
use std::fmt::Debug;

/// Destination of completed matches
///
/// Matches of one query arrive in completion order. A failing `publish` is
/// reported by the runtime and does not stop enumeration.
pub trait MatchSink: Debug + Send + Sync {
    fn publish(&self, event: &ComplexEvent) -> EventFluxResult<()>;

    /// Called once per `process_available` round after its last `publish`
    fn flush(&self) -> EventFluxResult<()> {
        Ok(())
    }
}

impl<T: MatchSink + ?Sized> MatchSink for std::sync::Arc<T> {
    fn publish(&self, event: &ComplexEvent) -> EventFluxResult<()> {
        (**self).publish(event)
    }

    fn flush(&self) -> EventFluxResult<()> {
        (**self).flush()
    }
}
