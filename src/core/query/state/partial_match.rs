// SPDX-License-Identifier: MIT OR Apache-2.0

use super::cea::RoleSet;
use crate::core::stream::tuple::{SchemaId, TupleRef};
use crate::query_api::query::Within;
use smallvec::SmallVec;

/// A tuple that joined a match, with the roles it was bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTuple {
    pub tuple: TupleRef,
    pub event_type: SchemaId,
    pub roles: RoleSet,
}

/// An in-progress run of the automaton
///
/// Tuples are held by reference only and always in increasing position order.
#[derive(Debug, Clone)]
pub struct PartialMatch<S> {
    pub state: S,
    pub events: SmallVec<[MatchedTuple; 4]>,
    pub start_timestamp: i64,
    pub start_ingestion: i64,
    /// Ordinal of the first tuple among the tuples the enumerator processed
    pub start_ordinal: u64,
}

impl<S> PartialMatch<S> {
    pub fn new(state: S, first: MatchedTuple, timestamp: i64, ingestion: i64, ordinal: u64) -> Self {
        let mut events = SmallVec::new();
        events.push(first);
        Self {
            state,
            events,
            start_timestamp: timestamp,
            start_ingestion: ingestion,
            start_ordinal: ordinal,
        }
    }

    pub fn first_event_type(&self) -> Option<SchemaId> {
        self.events.first().map(|e| e.event_type)
    }

    pub fn start_position(&self) -> u64 {
        self.events.first().map_or(0, |e| e.tuple.position)
    }

    pub fn contains(&self, position: u64) -> bool {
        self.events
            .binary_search_by_key(&position, |e| e.tuple.position)
            .is_ok()
    }

    /// Shares at least one tuple with `positions` (sorted)
    pub fn overlaps(&self, positions: &[u64]) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.events.len() && j < positions.len() {
            let p = self.events[i].tuple.position;
            match p.cmp(&positions[j]) {
                std::cmp::Ordering::Equal => return true,
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        false
    }

    pub fn positions(&self) -> Vec<u64> {
        self.events.iter().map(|e| e.tuple.position).collect()
    }

    /// Adding a tuple with these coordinates would stretch the match past `within`
    pub fn is_expired(&self, within: Within, ordinal: u64, timestamp: i64, ingestion: i64) -> bool {
        match within {
            Within::Unbounded => false,
            Within::Events(n) => ordinal.saturating_sub(self.start_ordinal) + 1 > n,
            Within::EventTime(ms) => timestamp.saturating_sub(self.start_timestamp) > span(ms),
            Within::IngestionTime(ms) => ingestion.saturating_sub(self.start_ingestion) > span(ms),
        }
    }

    pub(crate) fn push(&mut self, tuple: MatchedTuple) {
        self.events.push(tuple);
    }
}

/// Windows past the i64 range never expire anything
#[inline]
fn span(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(position: u64) -> MatchedTuple {
        MatchedTuple {
            tuple: TupleRef::new(position),
            event_type: 0,
            roles: RoleSet::new(),
        }
    }

    fn sample() -> PartialMatch<u32> {
        let mut m = PartialMatch::new(1u32, tuple(2), 100, 5000, 3);
        m.push(tuple(5));
        m.push(tuple(9));
        m
    }

    #[test]
    fn test_contains_and_overlaps() {
        let m = sample();
        assert!(m.contains(5));
        assert!(!m.contains(6));
        assert!(m.overlaps(&[1, 9]));
        assert!(!m.overlaps(&[3, 4, 10]));
        assert_eq!(m.start_position(), 2);
        assert_eq!(m.positions(), vec![2, 5, 9]);
    }

    #[test]
    fn test_window_expiry() {
        let m = sample();
        // ordinals 3..=5 span three tuples
        assert!(!m.is_expired(Within::Events(3), 5, 0, 0));
        assert!(m.is_expired(Within::Events(3), 6, 0, 0));
        assert!(!m.is_expired(Within::EventTime(50), 0, 150, 0));
        assert!(m.is_expired(Within::EventTime(50), 0, 151, 0));
        assert!(m.is_expired(Within::IngestionTime(10), 0, 0, 5011));
        assert!(!m.is_expired(Within::Unbounded, u64::MAX, i64::MAX, i64::MAX));
    }

    #[test]
    fn test_window_beyond_i64_range() {
        let m = sample();
        assert!(!m.is_expired(Within::EventTime(u64::MAX), 0, 101, 0));
        assert!(!m.is_expired(Within::IngestionTime(u64::MAX), 0, 0, i64::MAX));
        assert!(!m.is_expired(Within::EventTime(i64::MAX as u64 + 1), 0, i64::MAX, 0));
    }
}
