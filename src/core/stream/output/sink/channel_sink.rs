// SPDX-License-Identifier: MIT OR Apache-2.0

use super::sink_trait::MatchSink;
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::ComplexEvent;
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Hands matches to another thread over a crossbeam channel
///
/// A bounded channel never blocks the enumerating thread: a full channel
/// fails the publish instead.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<ComplexEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<ComplexEvent>) -> Self {
        Self { sender }
    }

    pub fn unbounded() -> (Self, Receiver<ComplexEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    pub fn bounded(capacity: usize) -> (Self, Receiver<ComplexEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }
}

impl MatchSink for ChannelSink {
    fn publish(&self, event: &ComplexEvent) -> EventFluxResult<()> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => EventFluxError::other("match channel is full"),
            TrySendError::Disconnected(_) => EventFluxError::other("match channel receiver dropped"),
        })
    }
}
