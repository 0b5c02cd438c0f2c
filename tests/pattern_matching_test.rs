// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pattern matching: compile a query, append tuples, collect matches
//!
//! Positions in expectations are tuple store positions; every test starts on
//! an empty store, so the n-th appended event has position n-1.

use eventflux_pattern::core::stream::output::CollectingSink;
use eventflux_pattern::query_api::expression::{Expression, IndexedVariable};
use eventflux_pattern::query_api::pattern::CompareOp;
use eventflux_pattern::query_api::query::Correlation;
use eventflux_pattern::sql_compiler::error::CompileError;
use eventflux_pattern::{
    AttributeValue, ConsumeBy, Filter, Formula, Predicate, Query, QueryCompiler, QueryRuntime,
    Select, Within,
};

mod common;
use common::{h, h_in, positions, s, t, x, Harness};

fn temp_gt(v: f64) -> Predicate {
    Predicate::compare(Expression::variable("temp"), CompareOp::GreaterThan, Expression::constant(v))
}

/// Pattern: H+
/// Events: H1 X1 H2 H3
/// Expected: every ordered selection of H events that skips no H after its start
#[test]
fn test_non_contiguous_iteration_enumerates_all_runs() {
    let harness = Harness::new();
    let matches = harness.run(
        &Query::new(Formula::event("H").iteration()),
        &[h(1, 20.0), x(2), h(3, 21.0), h(4, 22.0)],
    );
    assert_eq!(
        positions(&matches),
        vec![
            vec![0],
            vec![0, 2],
            vec![2],
            vec![0, 2, 3],
            vec![2, 3],
            vec![3],
        ]
    );
    let sequences: Vec<u64> = matches.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);
}

/// Pattern: S ; T with S[last].value < T[0].temp
#[test]
fn test_correlation_between_events() {
    let query = Query::new(Formula::event("S").followed_by(Formula::event("T"))).correlate(
        Correlation::new(
            IndexedVariable::new_with_last("value").of_variable("S"),
            CompareOp::LessThan,
            IndexedVariable::new_with_index("temp", 0).of_variable("T"),
        ),
    );

    let harness = Harness::new();
    let matches = harness.run(&query, &[s(1, 5), t(2, 10.0)]);
    assert_eq!(positions(&matches), vec![vec![0, 1]]);
    assert_eq!(matches[0].events[0].event_type, "S");
    assert_eq!(matches[0].events[1].get("temp"), Some(&AttributeValue::Double(10.0)));

    let harness = Harness::new();
    assert!(harness.run(&query, &[s(1, 10), t(2, 5.0)]).is_empty());
}

/// Pattern: H : T
/// Events: H1 X1 T1 (broken) and H1 T1 (matches)
#[test]
fn test_contiguous_sequence() {
    let query = Query::new(Formula::event("H").followed_immediately_by(Formula::event("T")));

    let harness = Harness::new();
    assert!(harness.run(&query, &[h(1, 20.0), x(2), t(3, 20.0)]).is_empty());

    let harness = Harness::new();
    let matches = harness.run(&query, &[h(1, 20.0), t(2, 20.0)]);
    assert_eq!(positions(&matches), vec![vec![0, 1]]);
    assert_eq!(matches[0].start_timestamp, 1);
    assert_eq!(matches[0].end_timestamp, 2);
}

/// Pattern: H+ LIMIT 1
/// Events: H1 H2 H3
/// Expected: one match, then nothing
#[test]
fn test_limit_stops_the_query() {
    let harness = Harness::new();
    let compiled = harness.compile(&Query::new(Formula::event("H").iteration()).limit(1));
    let mut runtime = QueryRuntime::new(&compiled, &harness.store);
    let sink = CollectingSink::new();

    harness.push(&h(1, 20.0));
    harness.push(&h(2, 20.0));
    runtime.process_available(&sink).unwrap();
    harness.push(&h(3, 20.0));
    let report = runtime.process_available(&sink).unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(positions(&sink.take()), vec![vec![0]]);
    assert!(runtime.is_exhausted());
}

/// Pattern: H+ :  X breaks the run, later H starts over
#[test]
fn test_contiguous_iteration() {
    let harness = Harness::new();
    let matches = harness.run(
        &Query::new(Formula::event("H").contiguous_iteration()),
        &[h(1, 1.0), h(2, 1.0), x(3), h(4, 1.0)],
    );
    assert_eq!(
        positions(&matches),
        vec![vec![0], vec![0, 1], vec![1], vec![3]]
    );
}

#[test]
fn test_disjunction() {
    let harness = Harness::new();
    let matches = harness.run(
        &Query::new(Formula::event("H").or(Formula::event("T"))),
        &[h(1, 1.0), s(2, 0), t(3, 1.0)],
    );
    assert_eq!(positions(&matches), vec![vec![0], vec![2]]);
}

/// Pattern: (H ; T) OR (H : S ; X)
/// Events: H1 S1 T1
/// S1 advances the second branch while the first branch skips it, so the
/// only match is H1 T1; S1 never joins a sequence the first branch emits.
#[test]
fn test_disjunction_keeps_skipped_and_consumed_runs_apart() {
    let harness = Harness::new();
    let formula = Formula::event("H")
        .followed_by(Formula::event("T"))
        .or(Formula::event("H")
            .followed_immediately_by(Formula::event("S"))
            .followed_by(Formula::event("X")));
    let matches = harness.run(&Query::new(formula), &[h(1, 1.0), s(2, 0), t(3, 1.0)]);
    assert_eq!(positions(&matches), vec![vec![0, 2]]);
}

/// Pattern: (H ; T) OR (H : S ; X)
/// Events: H1 S1 X1 T1
/// Both branches complete from the same H, each with its own tuples.
#[test]
fn test_disjunction_branches_complete_independently() {
    let harness = Harness::new();
    let formula = Formula::event("H")
        .followed_by(Formula::event("T"))
        .or(Formula::event("H")
            .followed_immediately_by(Formula::event("S"))
            .followed_by(Formula::event("X")));
    let matches = harness.run(&Query::new(formula), &[h(1, 1.0), s(2, 0), x(3), t(4, 1.0)]);
    assert_eq!(positions(&matches), vec![vec![0, 1, 2], vec![0, 3]]);
}

/// Pattern: (H FILTER H[temp > 30]) ; T
#[test]
fn test_filter_guards_start() {
    let harness = Harness::new();
    let formula = Formula::event("H")
        .filter(Filter::atomic("H", temp_gt(30.0)))
        .followed_by(Formula::event("T"));
    let matches = harness.run(&Query::new(formula), &[h(1, 25.0), h(2, 35.0), t(3, 20.0)]);
    assert_eq!(positions(&matches), vec![vec![1, 2]]);
}

#[test]
fn test_like_filter() {
    let harness = Harness::new();
    let formula = Formula::event("H").filter(Filter::atomic("H", Predicate::like("city", "Par%")));
    let matches = harness.run(
        &Query::new(formula),
        &[h_in(1, 1.0, "Lyon"), h_in(2, 1.0, "Paris"), h_in(3, 1.0, "Parma")],
    );
    assert_eq!(positions(&matches), vec![vec![1], vec![2]]);
}

/// Roles bound with AS are reported on the contributing events
#[test]
fn test_roles_in_output() {
    let harness = Harness::new();
    let formula = Formula::event("H")
        .with_role("hot")
        .filter(Filter::atomic("hot", temp_gt(30.0)))
        .followed_by(Formula::bound_event("T", "after"));
    let matches = harness.run(&Query::new(formula), &[h(1, 35.0), t(2, 10.0)]);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].events[0].roles, vec!["hot".to_string()]);
    assert!(matches[0].events[1].has_role("after"));
}

/// A match failing a correlation is not emitted but keeps growing
#[test]
fn test_failed_correlation_keeps_match_alive() {
    let query = Query::new(Formula::event("H").iteration()).correlate(Correlation::new(
        IndexedVariable::new_with_index("temp", 0).of_variable("H"),
        CompareOp::LessThan,
        IndexedVariable::new_with_last("temp").of_variable("H"),
    ));
    let harness = Harness::new();
    let matches = harness.run(&query, &[h(1, 20.0), h(2, 10.0), h(3, 30.0)]);
    assert_eq!(positions(&matches), vec![vec![0, 1, 2], vec![1, 2]]);
}

/// Pattern: H ; T WITHIN 10 ms of event time
#[test]
fn test_event_time_window() {
    let harness = Harness::new();
    let query = Query::new(Formula::event("H").followed_by(Formula::event("T")))
        .within(Within::EventTime(10));
    let matches = harness.run(&query, &[h(0, 1.0), t(5, 1.0), h(100, 1.0), t(200, 1.0)]);
    assert_eq!(positions(&matches), vec![vec![0, 1]]);
}

/// A window beyond the i64 range behaves as unbounded
#[test]
fn test_huge_time_window() {
    for within in [Within::EventTime(u64::MAX), Within::IngestionTime(u64::MAX)] {
        let harness = Harness::new();
        let query = Query::new(Formula::event("H").followed_by(Formula::event("T"))).within(within);
        let matches = harness.run(&query, &[h(1, 1.0), t(2, 1.0)]);
        assert_eq!(matches.len(), 1, "{:?}", within);
        assert_eq!(matches[0].events.len(), 2);
    }
}

#[test]
fn test_event_count_window() {
    let harness = Harness::new();
    let query = Query::new(Formula::event("H").followed_by(Formula::event("T")))
        .within(Within::Events(3));
    let matches = harness.run(&query, &[h(1, 1.0), x(2), x(3), t(4, 1.0), h(5, 1.0), x(6), t(7, 1.0)]);
    assert_eq!(positions(&matches), vec![vec![4, 6]]);
}

/// Pattern: H ; T over H1 H2 T1
/// Without consumption both H events pair with T1; consuming by event type
/// retires every other H-started match that shares T1.
#[test]
fn test_consume_by_event_type() {
    let inputs = [h(1, 1.0), h(2, 1.0), t(3, 1.0)];
    let formula = Formula::event("H").followed_by(Formula::event("T"));

    let harness = Harness::new();
    let matches = harness.run(&Query::new(formula.clone()), &inputs);
    assert_eq!(positions(&matches), vec![vec![0, 2], vec![1, 2]]);

    let harness = Harness::new();
    let matches = harness.run(&Query::new(formula).consume_by(ConsumeBy::EventType), &inputs);
    assert_eq!(positions(&matches), vec![vec![0, 2]]);
}

#[test]
fn test_consume_by_any() {
    let harness = Harness::new();
    let matches = harness.run(
        &Query::new(Formula::event("H").iteration()).consume_by(ConsumeBy::Any),
        &[h(1, 1.0), h(2, 1.0)],
    );
    assert_eq!(positions(&matches), vec![vec![0], vec![1]]);
}

#[test]
fn test_select_projection() {
    let harness = Harness::new();
    let query = Query::new(Formula::bound_event("S", "first").followed_by(Formula::event("T")))
        .select(Select::Variables(vec!["T".to_string()]));
    let matches = harness.run(&query, &[s(1, 1), t(2, 1.0)]);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].events.len(), 1);
    assert_eq!(matches[0].events[0].event_type, "T");
    // timestamps still cover the whole match
    assert_eq!(matches[0].start_timestamp, 1);
}

/// Tuples outside the FROM streams are invisible, so they cannot break contiguity
#[test]
fn test_from_stream_skips_other_event_types() {
    let formula = Formula::event("H").followed_immediately_by(Formula::event("T"));
    let inputs = [h(1, 1.0), s(2, 0), t(3, 1.0)];

    let harness = Harness::new();
    assert!(harness.run(&Query::new(formula.clone()), &inputs).is_empty());

    let harness = Harness::new();
    let matches = harness.run(&Query::new(formula).from_stream("Weather"), &inputs);
    assert_eq!(positions(&matches), vec![vec![0, 2]]);
}

/// A runtime opened at an old position replays retained tuples
#[test]
fn test_replay_from_position() {
    let harness = Harness::new();
    for input in [h(1, 1.0), t(2, 1.0)] {
        harness.push(&input);
    }
    let compiled = harness.compile(&Query::new(Formula::event("H").followed_by(Formula::event("T"))));

    let sink = CollectingSink::new();
    QueryRuntime::new(&compiled, &harness.store)
        .process_available(&sink)
        .unwrap();
    assert!(sink.is_empty());

    QueryRuntime::starting_at(&compiled, &harness.store, 0)
        .process_available(&sink)
        .unwrap();
    assert_eq!(positions(&sink.take()), vec![vec![0, 1]]);
}

/// Two queries read the same store independently
#[test]
fn test_queries_share_a_store() {
    let harness = Harness::new();
    let first = harness.compile(&Query::new(Formula::event("H")));
    let second = harness.compile(&Query::new(Formula::event("T")));
    let mut a = QueryRuntime::new(&first, &harness.store);
    let mut b = QueryRuntime::new(&second, &harness.store);
    harness.push(&h(1, 1.0));
    harness.push(&t(2, 1.0));

    let (sink_a, sink_b) = (CollectingSink::new(), CollectingSink::new());
    a.process_available(&sink_a).unwrap();
    b.process_available(&sink_b).unwrap();
    assert_eq!(positions(&sink_a.take()), vec![vec![0]]);
    assert_eq!(positions(&sink_b.take()), vec![vec![1]]);
    assert_ne!(first.id, second.id);
}

#[test]
fn test_compile_errors() {
    let harness = Harness::new();
    let compiler = QueryCompiler::new(&harness.catalog);

    let err = compiler.compile(&Query::new(Formula::event("Q"))).unwrap_err();
    assert_eq!(err, CompileError::UnknownEventType("Q".into()));

    let err = compiler
        .compile(&Query::new(Formula::event("H").filter(Filter::atomic("T", temp_gt(1.0)))))
        .unwrap_err();
    assert_eq!(err, CompileError::UnknownVariable("T".into()));

    let err = compiler
        .compile(&Query::new(Formula::event("H")).limit(0))
        .unwrap_err();
    assert!(matches!(err, CompileError::InvalidLimit(_)));

    let err = compiler
        .compile(&Query::new(Formula::event("H")).from_stream("Nowhere"))
        .unwrap_err();
    assert_eq!(err, CompileError::UnknownStream("Nowhere".into()));

    let err = compiler
        .compile(&Query::new(
            Formula::event("H").filter(Filter::atomic("H", Predicate::like("temp", "1%"))),
        ))
        .unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));

    let err = compiler
        .compile(&Query::new(Formula::event("H").filter(Filter::atomic(
            "H",
            Predicate::compare(Expression::variable("pressure"), CompareOp::Equal, Expression::constant(1.0)),
        ))))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownAttribute { .. }));
}
