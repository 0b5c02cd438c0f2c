// SPDX-License-Identifier: MIT OR Apache-2.0

//! Match enumeration over an automaton
//!
//! The enumerator owns every partial match of one query. For each tuple it
//! expires matches that left the window, advances the rest oldest first on
//! the tuple's symbol, emits accepting runs and tries to start a new run at
//! the tuple. A partial match whose runs split on a tuple (some consume it,
//! some wait past it) forks into two matches with different tuple lists. Emitted matches are materialized from the tuple store, checked
//! against the query's correlations and projected.

use super::automaton::MatchAutomaton;
use super::cea::{Cea, RoleId};
use super::det_cea::DetCea;
use super::partial_match::{MatchedTuple, PartialMatch};
use crate::core::event::complex_event::{ComplexEvent, MatchedEvent};
use crate::core::event::value::AttributeValue;
use crate::core::executor::bitmask::PredicateBitmask;
use crate::core::executor::condition::compare_values;
use crate::core::stream::tuple::{SchemaId, TupleRef, TupleStore, TupleView};
use crate::query_api::expression::indexed_variable::EventIndex;
use crate::query_api::pattern::CompareOp;
use crate::query_api::query::{ConsumeBy, Query, Select, Within};
use crate::sql_compiler::catalog::CatalogLookup;
use crate::sql_compiler::error::CompileError;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Which matched tuples a pattern variable refers to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableBinding {
    /// Set when the variable is an event type name of the formula
    pub event_type: Option<SchemaId>,
    /// Set when the variable is a role of the formula
    pub role: Option<RoleId>,
}

impl VariableBinding {
    pub fn binds(&self, tuple: &MatchedTuple) -> bool {
        self.event_type == Some(tuple.event_type)
            || self.role.is_some_and(|r| tuple.roles.contains(r))
    }
}

#[derive(Debug, Clone)]
struct BoundAttribute {
    binding: VariableBinding,
    index: EventIndex,
    attribute: String,
}

impl BoundAttribute {
    fn value(&self, events: &[MatchedTuple], views: &[TupleView]) -> Option<AttributeValue> {
        let bound: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| self.binding.binds(e))
            .map(|(i, _)| i)
            .collect();
        let at = self.index.resolve(bound.len())?;
        views[bound[at]].get_by_name(&self.attribute)
    }
}

#[derive(Debug, Clone)]
struct CorrelationCheck {
    left: BoundAttribute,
    op: CompareOp,
    right: BoundAttribute,
}

/// Query-level settings the enumerator applies around the automaton
#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub query_id: Uuid,
    pub name: String,
    pub within: Within,
    pub consume_by: ConsumeBy,
    pub limit: Option<u64>,
    /// `None` keeps every contributing event
    select: Option<Vec<VariableBinding>>,
    correlations: Vec<CorrelationCheck>,
    role_names: Vec<String>,
    /// Indexed by event type id; `None` when the query reads every event type
    accepted_event_types: Option<Vec<bool>>,
}

impl MatchPlan {
    pub fn new(
        query_id: Uuid,
        query: &Query,
        cea: &Cea,
        catalog: &dyn CatalogLookup,
    ) -> Result<Self, CompileError> {
        let formula_types = query.formula.event_types();
        let resolve = |name: &str| -> Result<VariableBinding, CompileError> {
            let binding = VariableBinding {
                event_type: formula_types
                    .contains(name)
                    .then(|| catalog.event_type(name).map(|info| info.id))
                    .flatten(),
                role: cea
                    .role_names()
                    .iter()
                    .position(|r| r == name)
                    .map(|i| i as RoleId),
            };
            if binding.event_type.is_none() && binding.role.is_none() {
                return Err(CompileError::UnknownVariable(name.to_string()));
            }
            Ok(binding)
        };

        let select = match &query.select {
            Select::Star => None,
            Select::Variables(names) => Some(
                names
                    .iter()
                    .map(|n| resolve(n))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let mut correlations = Vec::with_capacity(query.correlations.len());
        for c in &query.correlations {
            let bind = |v: &crate::query_api::expression::IndexedVariable| {
                Ok::<_, CompileError>(BoundAttribute {
                    binding: resolve(&v.variable)?,
                    index: v.index.clone(),
                    attribute: v.attribute_name.clone(),
                })
            };
            correlations.push(CorrelationCheck {
                left: bind(&c.left)?,
                op: c.op,
                right: bind(&c.right)?,
            });
        }

        let accepted_event_types = if query.from.is_empty() {
            None
        } else {
            let mut accepted = vec![false; catalog.event_type_count()];
            for stream in &query.from {
                let definition = catalog
                    .stream(stream)
                    .ok_or_else(|| CompileError::UnknownStream(stream.clone()))?;
                for name in &definition.event_types {
                    if let Some(info) = catalog.event_type(name) {
                        if let Some(slot) = accepted.get_mut(info.id as usize) {
                            *slot = true;
                        }
                    }
                }
            }
            Some(accepted)
        };

        Ok(Self {
            query_id,
            name: query
                .name
                .clone()
                .unwrap_or_else(|| format!("query-{}", query_id.simple())),
            within: query.within,
            consume_by: query.consume_by,
            limit: query.limit,
            select,
            correlations,
            role_names: cea.role_names().to_vec(),
            accepted_event_types,
        })
    }

    /// The query reads tuples of this event type
    pub fn accepts(&self, event_type: SchemaId) -> bool {
        self.accepted_event_types
            .as_ref()
            .map_or(true, |a| a.get(event_type as usize).copied().unwrap_or(false))
    }

    fn correlations_hold(&self, events: &[MatchedTuple], views: &[TupleView]) -> bool {
        self.correlations.iter().all(|c| {
            match (c.left.value(events, views), c.right.value(events, views)) {
                (Some(l), Some(r)) => c.op.matches(compare_values(&l, &r)),
                _ => false,
            }
        })
    }

    fn selects(&self, tuple: &MatchedTuple) -> bool {
        self.select
            .as_ref()
            .map_or(true, |bindings| bindings.iter().any(|b| b.binds(tuple)))
    }
}

/// Result of feeding one tuple to an enumerator
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    /// Completed matches in emission order
    pub matches: Vec<ComplexEvent>,
    /// Tuples that were reclaimed before a match using them could be materialized
    pub stale_references: Vec<TupleRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumeratorStats {
    pub processed: u64,
    /// Tuples outside the query's `FROM` streams
    pub skipped: u64,
    pub started: u64,
    pub emitted: u64,
    pub expired: u64,
    pub died: u64,
    /// Partial matches discarded by the consumption policy
    pub consumed: u64,
    pub stale: u64,
}

enum Settled<S> {
    Alive(PartialMatch<S>),
    Dropped,
    Emitted(PartialMatch<S>),
}

/// Bookkeeping of one `process` call
struct Round<S> {
    pending: VecDeque<PartialMatch<S>>,
    survivors: VecDeque<PartialMatch<S>>,
    /// (first event type, positions) of matches retired under `ConsumeBy::EventType`
    consumed: Vec<(Option<SchemaId>, Vec<u64>)>,
    block_start: bool,
    stop: bool,
}

pub struct MatchEnumerator<A: MatchAutomaton = DetCea> {
    automaton: Arc<A>,
    plan: Arc<MatchPlan>,
    matches: VecDeque<PartialMatch<A::State>>,
    ordinal: u64,
    exhausted: bool,
    stats: EnumeratorStats,
}

impl<A: MatchAutomaton> MatchEnumerator<A> {
    pub fn new(automaton: Arc<A>, plan: Arc<MatchPlan>) -> Self {
        Self {
            automaton,
            plan,
            matches: VecDeque::new(),
            ordinal: 0,
            exhausted: false,
            stats: EnumeratorStats::default(),
        }
    }

    pub fn plan(&self) -> &Arc<MatchPlan> {
        &self.plan
    }

    pub fn stats(&self) -> EnumeratorStats {
        self.stats
    }

    /// LIMIT reached; no further tuple is examined
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn live_matches(&self) -> usize {
        self.matches.len()
    }

    /// Oldest store position a live partial match still refers to
    pub fn oldest_needed(&self) -> Option<u64> {
        self.matches.iter().map(|m| m.start_position()).min()
    }

    /// Feed the next tuple of the stream
    pub fn process(
        &mut self,
        tuple: &TupleView,
        mask: &PredicateBitmask,
        store: &TupleStore,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        if self.exhausted {
            return outcome;
        }
        let event_type = tuple.schema_id();
        if !self.plan.accepts(event_type) {
            self.stats.skipped += 1;
            return outcome;
        }
        self.ordinal += 1;
        self.stats.processed += 1;

        let (ordinal, timestamp, ingestion) =
            (self.ordinal, tuple.timestamp(), tuple.ingestion_timestamp());
        let within = self.plan.within;
        let before = self.matches.len();
        self.matches
            .retain(|m| !m.is_expired(within, ordinal, timestamp, ingestion));
        self.stats.expired += (before - self.matches.len()) as u64;

        let symbol = self.automaton.classify(event_type, mask);
        let mut round = Round {
            pending: std::mem::take(&mut self.matches),
            survivors: VecDeque::new(),
            consumed: Vec::new(),
            block_start: false,
            stop: false,
        };

        while let Some(mut m) = round.pending.pop_front() {
            let step = self.automaton.step(&m.state, &symbol);
            let consumed = (!self.automaton.is_dead(&step.consumed)).then_some(step.consumed);
            let skipped = (!self.automaton.is_dead(&step.skipped)).then_some(step.skipped);

            // runs that took the tuple and runs that let it pass now hold different tuples
            let mut branches: SmallVec<[(PartialMatch<A::State>, bool); 2]> = SmallVec::new();
            match (consumed, skipped) {
                (None, None) => {
                    self.stats.died += 1;
                    continue;
                }
                (None, Some(skipped)) => {
                    m.state = skipped;
                    branches.push((m, false));
                }
                (Some(consumed), skipped) => {
                    let mut advanced = match skipped {
                        Some(skipped) => {
                            let advanced = m.clone();
                            m.state = skipped;
                            branches.push((m, false));
                            advanced
                        }
                        None => m,
                    };
                    advanced.state = consumed;
                    advanced.push(MatchedTuple {
                        tuple: tuple.tuple_ref(),
                        event_type,
                        roles: step.roles,
                    });
                    branches.insert(0, (advanced, true));
                }
            }

            for (m, marked) in branches {
                if round.stop {
                    break;
                }
                if round
                    .consumed
                    .iter()
                    .any(|(first, positions)| m.first_event_type() == *first && m.overlaps(positions))
                {
                    self.stats.consumed += 1;
                    continue;
                }
                self.settle(m, marked, tuple, store, &mut outcome, &mut round);
            }
            if round.stop {
                break;
            }
        }

        if !round.stop && !round.block_start {
            let step = self.automaton.step(&self.automaton.initial(), &symbol);
            if !self.automaton.is_dead(&step.consumed) {
                self.stats.started += 1;
                let first = MatchedTuple {
                    tuple: tuple.tuple_ref(),
                    event_type,
                    roles: step.roles,
                };
                let m = PartialMatch::new(step.consumed, first, timestamp, ingestion, ordinal);
                self.settle(m, true, tuple, store, &mut outcome, &mut round);
            }
        }

        log::trace!(
            "[{}] tuple #{} (type {}): {} live, {} emitted",
            self.plan.name,
            tuple.position(),
            event_type,
            round.survivors.len(),
            outcome.matches.len()
        );
        self.matches = round.survivors;
        outcome
    }

    /// Emit, keep or drop an advanced match, then apply the consumption policy
    fn settle(
        &mut self,
        m: PartialMatch<A::State>,
        marked: bool,
        current: &TupleView,
        store: &TupleStore,
        outcome: &mut ProcessOutcome,
        round: &mut Round<A::State>,
    ) {
        let terminal = self.automaton.is_terminal(&m.state);
        let settled = if marked && self.automaton.is_accepting(&m.state) {
            match self.materialize(&m, current, store) {
                Err(stale) => {
                    log::warn!(
                        "[{}] dropping match started at #{}: tuple {} was reclaimed",
                        self.plan.name,
                        m.start_position(),
                        stale
                    );
                    self.stats.stale += 1;
                    outcome.stale_references.push(stale);
                    Settled::Dropped
                }
                Ok(Some(event)) => {
                    outcome.matches.push(event);
                    Settled::Emitted(m)
                }
                Ok(None) if terminal => Settled::Dropped,
                Ok(None) => Settled::Alive(m),
            }
        } else if terminal {
            Settled::Dropped
        } else {
            Settled::Alive(m)
        };

        match settled {
            Settled::Alive(m) => round.survivors.push_back(m),
            Settled::Dropped => {}
            Settled::Emitted(m) => self.after_emission(m, terminal, current.schema_id(), round),
        }
    }

    fn after_emission(
        &mut self,
        emitter: PartialMatch<A::State>,
        terminal: bool,
        event_type: SchemaId,
        round: &mut Round<A::State>,
    ) {
        self.stats.emitted += 1;
        if self.plan.limit.is_some_and(|limit| self.stats.emitted >= limit) {
            log::debug!(
                "[{}] limit of {} matches reached",
                self.plan.name,
                self.stats.emitted
            );
            round.pending.clear();
            round.survivors.clear();
            round.stop = true;
            self.exhausted = true;
            return;
        }

        match self.plan.consume_by {
            ConsumeBy::None => {
                if !terminal {
                    round.survivors.push_back(emitter);
                }
            }
            ConsumeBy::Any => {
                self.stats.consumed += (round.pending.len() + round.survivors.len()) as u64;
                round.pending.clear();
                round.survivors.clear();
                round.block_start = true;
                round.stop = true;
            }
            ConsumeBy::EventType => {
                let first = emitter.first_event_type();
                let positions = emitter.positions();
                let before = round.survivors.len();
                round
                    .survivors
                    .retain(|s| !(s.first_event_type() == first && s.overlaps(&positions)));
                self.stats.consumed += (before - round.survivors.len()) as u64;
                if first == Some(event_type) {
                    round.block_start = true;
                }
                round.consumed.push((first, positions));
            }
        }
    }

    /// `Ok(None)` when a correlation fails; `Err` names a reclaimed tuple
    fn materialize(
        &self,
        m: &PartialMatch<A::State>,
        current: &TupleView,
        store: &TupleStore,
    ) -> Result<Option<ComplexEvent>, TupleRef> {
        let mut views = Vec::with_capacity(m.events.len());
        for e in &m.events {
            if e.tuple == current.tuple_ref() {
                views.push(current.clone());
                continue;
            }
            match store.read(e.tuple) {
                Ok(view) => views.push(view),
                Err(err) => {
                    log::debug!("[{}] cannot read {}: {}", self.plan.name, e.tuple, err);
                    return Err(e.tuple);
                }
            }
        }

        if !self.plan.correlations_hold(&m.events, &views) {
            return Ok(None);
        }

        let events = m
            .events
            .iter()
            .zip(&views)
            .filter(|(e, _)| self.plan.selects(e))
            .map(|(e, view)| MatchedEvent {
                position: e.tuple.position,
                event_type: view.schema().name.clone(),
                roles: e
                    .roles
                    .iter()
                    .filter_map(|r| self.plan.role_names.get(r as usize).cloned())
                    .collect(),
                timestamp: view.timestamp(),
                attributes: view.named_values(),
            })
            .collect();

        Ok(Some(ComplexEvent {
            query_id: self.plan.query_id,
            sequence: self.stats.emitted + 1,
            start_timestamp: views.first().map_or(0, |v| v.timestamp()),
            end_timestamp: views.last().map_or(0, |v| v.timestamp()),
            events,
        }))
    }
}
