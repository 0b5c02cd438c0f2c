// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query runtime: drives one compiled query over a tuple store
//!
//! ```text
//! QueryCursor ──► TupleStore::read ──► PredicateEvaluator ──► MatchEnumerator ──► MatchSink
//!      ▲                                                           │
//!      └──────────────── retain_from(oldest needed) ◄──────────────┘
//! ```
//!
//! The runtime never blocks: `process_available` drains what the store holds
//! and returns. After every tuple the cursor pin moves to the oldest tuple a
//! live partial match still refers to, so the store can reclaim everything
//! before it.

use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::executor::bitmask::PredicateBitmask;
use crate::core::executor::predicate_evaluator::PredicateEvaluator;
use crate::core::query::query_compiler::CompiledQuery;
use crate::core::query::state::{
    Cea, DetCea, EnumeratorStats, MatchAutomaton, MatchEnumerator, ProcessOutcome,
};
use crate::core::stream::output::MatchSink;
use crate::core::stream::tuple::{QueryCursor, TupleRef, TupleStore, TupleView};
use std::sync::Arc;
use uuid::Uuid;

/// Summary of one `process_available` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: u64,
    pub emitted: u64,
    /// Tuples reclaimed before this query could read them or finish a match with them
    pub stale_references: Vec<TupleRef>,
    pub publish_failures: u64,
}

pub struct QueryRuntime<A: MatchAutomaton = DetCea> {
    id: Uuid,
    name: String,
    store: Arc<TupleStore>,
    /// `None` once the query is exhausted, which releases the pin
    cursor: Option<QueryCursor>,
    evaluator: Arc<PredicateEvaluator>,
    enumerator: MatchEnumerator<A>,
    mask: PredicateBitmask,
}

impl QueryRuntime<DetCea> {
    /// Run `query` on tuples appended from now on
    pub fn new(query: &CompiledQuery, store: &Arc<TupleStore>) -> Self {
        Self::starting_at(query, store, store.head())
    }

    /// Run `query` from `position`, replaying tuples still retained
    pub fn starting_at(query: &CompiledQuery, store: &Arc<TupleStore>, position: u64) -> Self {
        Self::assemble(query, store, position, query.enumerator())
    }
}

impl QueryRuntime<Cea> {
    /// Runtime that simulates the nondeterministic automaton instead of the DetCEA
    pub fn simulated(query: &CompiledQuery, store: &Arc<TupleStore>, position: u64) -> Self {
        Self::assemble(query, store, position, query.nfa_enumerator())
    }
}

impl<A: MatchAutomaton> QueryRuntime<A> {
    fn assemble(
        query: &CompiledQuery,
        store: &Arc<TupleStore>,
        position: u64,
        enumerator: MatchEnumerator<A>,
    ) -> Self {
        log::debug!("[{}] runtime starting at #{}", query.name, position);
        let evaluator = Arc::clone(query.evaluator());
        Self {
            id: query.id,
            name: query.name.clone(),
            store: Arc::clone(store),
            cursor: Some(store.open_cursor_at(position)),
            mask: PredicateBitmask::new(evaluator.len()),
            evaluator,
            enumerator,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next position the runtime will read; `None` once exhausted
    pub fn position(&self) -> Option<u64> {
        self.cursor.as_ref().map(QueryCursor::position)
    }

    pub fn is_exhausted(&self) -> bool {
        self.enumerator.is_exhausted()
    }

    pub fn live_matches(&self) -> usize {
        self.enumerator.live_matches()
    }

    pub fn stats(&self) -> EnumeratorStats {
        self.enumerator.stats()
    }

    /// Process every tuple appended since the last call and publish the matches
    pub fn process_available(&mut self, sink: &dyn MatchSink) -> EventFluxResult<RunReport> {
        let mut report = RunReport::default();
        loop {
            let Some(cursor) = self.cursor.as_mut() else {
                break;
            };
            let tuple_ref = match cursor.next() {
                None => break,
                Some(Ok(tuple_ref)) => tuple_ref,
                Some(Err(EventFluxError::StaleReference {
                    position,
                    oldest_retained,
                })) => {
                    log::warn!(
                        "[{}] fell behind reclamation: #{} is gone, resuming at #{}",
                        self.name,
                        position,
                        oldest_retained
                    );
                    report.stale_references.push(TupleRef::new(position));
                    continue;
                }
                Some(Err(e)) => return Err(e),
            };
            let view = match self.store.read(tuple_ref) {
                Ok(view) => view,
                Err(e) if e.is_stale() => {
                    log::warn!("[{}] {}", self.name, e);
                    report.stale_references.push(tuple_ref);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let outcome = self.process_tuple(&view);
            report.processed += 1;
            report.stale_references.extend(outcome.stale_references);
            for event in &outcome.matches {
                report.emitted += 1;
                if let Err(e) = sink.publish(event) {
                    report.publish_failures += 1;
                    log::error!("[{}] sink publish failed: {}", self.name, e);
                }
            }

            if self.enumerator.is_exhausted() {
                log::debug!("[{}] exhausted, releasing store pin", self.name);
                self.cursor = None;
                break;
            }
            self.update_pin();
        }
        if let Err(e) = sink.flush() {
            log::error!("[{}] sink flush failed: {}", self.name, e);
        }
        Ok(report)
    }

    /// Evaluate predicates and step the enumerator on one tuple
    ///
    /// Tuples must be fed in position order; `process_available` does this
    /// from the cursor.
    pub fn process_tuple(&mut self, view: &TupleView) -> ProcessOutcome {
        self.evaluator.evaluate_into(view, &mut self.mask);
        self.enumerator.process(view, &self.mask, &self.store)
    }

    fn update_pin(&self) {
        if let Some(cursor) = &self.cursor {
            let oldest = self
                .enumerator
                .oldest_needed()
                .map_or(cursor.position(), |p| p.min(cursor.position()));
            cursor.retain_from(oldest);
        }
    }
}
