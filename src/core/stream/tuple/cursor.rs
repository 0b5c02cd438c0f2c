// SPDX-License-Identifier: MIT OR Apache-2.0

use super::tuple_store::{TupleRef, TupleStore};
use crate::core::error::{EventFluxError, EventFluxResult};
use std::sync::Arc;

/// Per-query read position over a [`TupleStore`]
///
/// Iterating never blocks: `None` means the cursor caught up with the head,
/// and a later call yields tuples appended since. A cursor that fell behind
/// reclamation yields one `StaleReference` error and resumes at the oldest
/// retained position.
///
/// The cursor pins the oldest position its owner still needs (initially its
/// start position); the store will not reclaim pinned slots under
/// `ReclaimPolicy::Reject`. Dropping the cursor releases the pin.
#[derive(Debug)]
pub struct QueryCursor {
    store: Arc<TupleStore>,
    id: u64,
    next_position: u64,
}

impl QueryCursor {
    pub(super) fn new(store: Arc<TupleStore>, id: u64, next_position: u64) -> Self {
        Self {
            store,
            id,
            next_position,
        }
    }

    /// Position of the next tuple this cursor will yield
    pub fn position(&self) -> u64 {
        self.next_position
    }

    pub fn store(&self) -> &Arc<TupleStore> {
        &self.store
    }

    /// Move the pin: positions before `position` may be reclaimed
    pub fn retain_from(&self, position: u64) {
        self.store.pin(self.id, position);
    }

    /// Skip over reclaimed positions; returns how many were skipped
    pub fn resync(&mut self) -> u64 {
        let oldest = self.store.oldest_retained();
        if self.next_position < oldest {
            let skipped = oldest - self.next_position;
            self.next_position = oldest;
            skipped
        } else {
            0
        }
    }
}

impl Iterator for QueryCursor {
    type Item = EventFluxResult<TupleRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_position >= self.store.head() {
            return None;
        }
        let position = self.next_position;
        let oldest = self.store.oldest_retained();
        if position < oldest {
            self.resync();
            return Some(Err(EventFluxError::StaleReference {
                position,
                oldest_retained: oldest,
            }));
        }
        self.next_position += 1;
        Some(Ok(TupleRef::new(position)))
    }
}

impl Drop for QueryCursor {
    fn drop(&mut self) {
        self.store.unpin(self.id);
    }
}
