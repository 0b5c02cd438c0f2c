// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomized checks of the match enumerator against two independent
//! evaluations of the same query:
//!
//! - the direct simulation of the nondeterministic automaton, driven through
//!   the same enumerator (consumption policies included);
//! - a run tracker that follows every individual NFA run with its own tuple
//!   list, with no state-set merging at all.

use eventflux_pattern::core::executor::PredicateBitmask;
use eventflux_pattern::core::query::state::{Cea, StateId};
use eventflux_pattern::core::stream::output::CollectingSink;
use eventflux_pattern::query_api::expression::Expression;
use eventflux_pattern::query_api::pattern::CompareOp;
use eventflux_pattern::{
    ConsumeBy, Filter, Formula, Predicate, Query, QueryRuntime, TupleRef, TupleView, Within,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

mod common;
use common::{h, positions, s, t, x, Harness, Input};

fn leaf(rng: &mut StdRng) -> Formula {
    let (name, attribute) = match rng.gen_range(0..3) {
        0 => ("H", "temp"),
        1 => ("T", "temp"),
        _ => ("S", "value"),
    };
    let formula = Formula::event(name);
    if !rng.gen_bool(0.4) {
        return formula;
    }
    let threshold = rng.gen_range(0..10);
    let constant = if attribute == "temp" {
        Expression::constant(threshold as f64)
    } else {
        Expression::constant(threshold as i64)
    };
    let op = if rng.gen_bool(0.5) {
        CompareOp::GreaterThan
    } else {
        CompareOp::LessThanEqual
    };
    formula.filter(Filter::atomic(
        name,
        Predicate::compare(Expression::variable(attribute), op, constant),
    ))
}

fn formula(rng: &mut StdRng, depth: u32) -> Formula {
    if depth == 0 || rng.gen_bool(0.25) {
        return leaf(rng);
    }
    match rng.gen_range(0..6) {
        0 => formula(rng, depth - 1).followed_by(formula(rng, depth - 1)),
        1 => formula(rng, depth - 1).followed_immediately_by(formula(rng, depth - 1)),
        2 => formula(rng, depth - 1).or(formula(rng, depth - 1)),
        3 => formula(rng, depth - 1).iteration(),
        4 => formula(rng, depth - 1).contiguous_iteration(),
        // branches of different lengths sharing a prefix type
        _ => {
            let short = leaf(rng).followed_by(leaf(rng));
            let long = leaf(rng)
                .followed_immediately_by(leaf(rng))
                .followed_by(formula(rng, depth - 1));
            short.or(long)
        }
    }
}

fn stream(rng: &mut StdRng, len: usize) -> Vec<Input> {
    (0..len as i64)
        .map(|ts| {
            let v = rng.gen_range(0..10);
            match rng.gen_range(0..4) {
                0 => h(ts, v as f64),
                1 => t(ts, v as f64),
                2 => s(ts, v),
                _ => x(ts),
            }
        })
        .collect()
}

/// (start timestamp, start position) of a run
type Start = (i64, u64);

/// Skip-till-next-match over individual NFA runs
///
/// A run is one live NFA state plus the tuples it consumed. Runs are expanded
/// over epsilon closures. A run in a non-wait state dies when it cannot
/// consume the tuple.
struct RunTracker<'a> {
    cea: &'a Cea,
    within: Within,
    runs: BTreeMap<(Vec<u64>, StateId), Start>,
}

impl<'a> RunTracker<'a> {
    fn new(cea: &'a Cea, within: Within) -> Self {
        Self {
            cea,
            within,
            runs: BTreeMap::new(),
        }
    }

    fn expired(&self, start: Start, timestamp: i64, position: u64) -> bool {
        match self.within {
            Within::Unbounded => false,
            Within::Events(n) => position - start.1 + 1 > n,
            Within::EventTime(ms) => timestamp - start.0 > ms as i64,
            Within::IngestionTime(_) => unreachable!("not generated"),
        }
    }

    /// Tuple lists completed by this tuple
    fn process(&mut self, view: &TupleView, mask: &PredicateBitmask) -> BTreeSet<Vec<u64>> {
        let (position, timestamp) = (view.position(), view.timestamp());
        let event_type = view.schema_id();
        let cea = self.cea;
        let enabled = |q: StateId| -> Vec<StateId> {
            cea.transitions(q)
                .iter()
                .filter(|t| cea.is_live(t.target))
                .filter(|t| t.event_type == event_type && t.guard.is_satisfied(mask))
                .map(|t| t.target)
                .collect()
        };

        let mut current: Vec<(Vec<u64>, StateId, Start)> = std::mem::take(&mut self.runs)
            .into_iter()
            .filter(|(_, start)| !self.expired(*start, timestamp, position))
            .map(|((events, q), start)| (events, q, start))
            .collect();
        current.extend(
            cea.initial_set()
                .into_iter()
                .map(|q| (Vec::new(), q, (timestamp, position))),
        );

        let mut next = BTreeMap::new();
        let mut completed = BTreeSet::new();
        for (events, q, start) in current {
            let targets = enabled(q);
            if !targets.is_empty() {
                let mut extended = events.clone();
                extended.push(position);
                for target in targets {
                    for &r in cea.closure_of(target).iter().filter(|&&r| cea.is_live(r)) {
                        if cea.is_final(r) {
                            completed.insert(extended.clone());
                        }
                        next.insert((extended.clone(), r), start);
                    }
                }
            }
            let waits = !events.is_empty()
                && cea.is_wait(q)
                && cea.closure_of(q).iter().all(|&r| enabled(r).is_empty());
            if waits {
                for &r in cea.closure_of(q).iter().filter(|&&r| cea.is_live(r)) {
                    next.insert((events.clone(), r), start);
                }
            }
        }
        self.runs = next;
        completed
    }
}

#[test]
fn test_det_cea_matches_nfa_simulation() {
    let mut rng = StdRng::seed_from_u64(0x5eed_cea);
    for round in 0..60 {
        let harness = Harness::new();
        let within = match rng.gen_range(0..3) {
            0 => Within::Unbounded,
            1 => Within::Events(rng.gen_range(1..8)),
            _ => Within::EventTime(rng.gen_range(1..10)),
        };
        let consume_by = match rng.gen_range(0..3) {
            0 => ConsumeBy::None,
            1 => ConsumeBy::Any,
            _ => ConsumeBy::EventType,
        };
        let query = Query::new(formula(&mut rng, 3))
            .within(within)
            .consume_by(consume_by);
        let compiled = harness.compile(&query);

        for input in stream(&mut rng, 32) {
            harness.push(&input);
        }

        let (det_sink, nfa_sink) = (CollectingSink::new(), CollectingSink::new());
        QueryRuntime::starting_at(&compiled, &harness.store, 0)
            .process_available(&det_sink)
            .unwrap();
        QueryRuntime::simulated(&compiled, &harness.store, 0)
            .process_available(&nfa_sink)
            .unwrap();

        let det = det_sink.take();
        let nfa = nfa_sink.take();
        assert_eq!(
            positions(&det),
            positions(&nfa),
            "round {}: {} diverged",
            round,
            query.formula
        );
        for (d, n) in det.iter().zip(&nfa) {
            let roles = |e: &eventflux_pattern::ComplexEvent| -> Vec<Vec<String>> {
                e.events.iter().map(|m| m.roles.clone()).collect()
            };
            assert_eq!(roles(d), roles(n));
        }
    }
}

/// Without consumption the enumerator emits exactly the tuple lists that some
/// single NFA run accepts
#[test]
fn test_enumerator_matches_individual_runs() {
    let mut rng = StdRng::seed_from_u64(0x7275_6e73);
    for round in 0..120 {
        let harness = Harness::new();
        let within = match rng.gen_range(0..3) {
            0 => Within::Unbounded,
            1 => Within::Events(rng.gen_range(1..10)),
            _ => Within::EventTime(rng.gen_range(1..12)),
        };
        let query = Query::new(formula(&mut rng, 3)).within(within);
        let compiled = harness.compile(&query);

        let inputs = stream(&mut rng, 24);
        for input in &inputs {
            harness.push(input);
        }

        let sink = CollectingSink::new();
        QueryRuntime::starting_at(&compiled, &harness.store, 0)
            .process_available(&sink)
            .unwrap();
        let mut emitted = positions(&sink.take());
        emitted.sort();

        let mut tracker = RunTracker::new(compiled.cea(), within);
        let mut expected = Vec::new();
        for position in 0..inputs.len() as u64 {
            let view = harness.store.read(TupleRef::new(position)).unwrap();
            let mask = compiled.evaluator().evaluate(&view);
            expected.extend(tracker.process(&view, &mask));
        }
        expected.sort();

        assert_eq!(emitted, expected, "round {}: {}", round, query.formula);
    }
}

/// Every deterministic state is an epsilon-closed set of live NFA states
#[test]
fn test_det_states_are_closed_live_sets() {
    let mut rng = StdRng::seed_from_u64(42);
    let harness = Harness::new();
    for _ in 0..20 {
        let compiled = harness.compile(&Query::new(formula(&mut rng, 3)));
        let cea = compiled.cea();
        let det = compiled.det_cea();
        for id in 0..det.state_count() as u32 {
            let state = det.state(id);
            assert_eq!(cea.closure(state.nfa_states.iter().copied()), state.nfa_states);
            assert!(state.nfa_states.iter().all(|&s| cea.is_live(s)));
            assert_eq!(state.accepting, cea.is_accepting_set(&state.nfa_states));
        }
    }
}
