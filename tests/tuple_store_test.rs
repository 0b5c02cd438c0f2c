// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tuple store retention under live queries: pins, backpressure, overwrite
//! and concurrent readers

use eventflux_pattern::core::config::{ReclaimPolicy, StoreConfig};
use eventflux_pattern::core::stream::output::CollectingSink;
use eventflux_pattern::{AttributeValue, EventFluxError, Formula, Query, QueryRuntime, TupleRef};
use std::sync::Arc;
use std::thread;

mod common;
use common::{h, positions, t, Harness};

/// A query waiting for T pins the H that started its match
#[test]
fn test_live_match_causes_backpressure() {
    let harness = Harness::with_store_config(StoreConfig::with_capacity(2));
    let compiled = harness.compile(&Query::new(Formula::event("H").followed_by(Formula::event("T"))));
    let mut runtime = QueryRuntime::new(&compiled, &harness.store);
    let sink = CollectingSink::new();

    harness.push(&h(1, 1.0));
    harness.push(&h(2, 1.0));
    runtime.process_available(&sink).unwrap();

    let err = harness
        .store
        .append(1, 3, &[AttributeValue::Double(1.0), AttributeValue::String("x".into())])
        .unwrap_err();
    assert!(matches!(err, EventFluxError::Backpressure { position: 2, pinned: 0 }));
    assert_eq!(harness.store.stats().rejected, 1);
}

/// Without live matches the pin follows the cursor and old tuples are reclaimed
#[test]
fn test_pin_moves_with_progress() {
    let harness = Harness::with_store_config(StoreConfig::with_capacity(2));
    let compiled = harness.compile(&Query::new(Formula::event("H").followed_immediately_by(Formula::event("T"))));
    let mut runtime = QueryRuntime::new(&compiled, &harness.store);
    let sink = CollectingSink::new();

    for ts in 0..10 {
        harness.push(&if ts % 2 == 0 { h(ts, 1.0) } else { t(ts, 1.0) });
        runtime.process_available(&sink).unwrap();
    }
    assert_eq!(sink.len(), 5);
    assert_eq!(harness.store.stats().reclaimed, 8);
}

/// Under the overwrite policy a lagging query loses tuples and reports them
#[test]
fn test_overwrite_policy_reports_stale_references() {
    let config = StoreConfig::with_capacity(2).reclaim(ReclaimPolicy::Overwrite);
    let harness = Harness::with_store_config(config);
    let compiled = harness.compile(&Query::new(Formula::event("H")));
    let mut runtime = QueryRuntime::new(&compiled, &harness.store);

    for ts in 0..5 {
        harness.push(&h(ts, 1.0));
    }
    let sink = CollectingSink::new();
    let report = runtime.process_available(&sink).unwrap();

    assert_eq!(report.stale_references, vec![TupleRef::new(0)]);
    assert_eq!(report.processed, 2);
    assert_eq!(positions(&sink.take()), vec![vec![3], vec![4]]);
}

/// A match whose first tuple was overwritten cannot be materialized
#[test]
fn test_overwritten_match_tuple_is_dropped() {
    let config = StoreConfig::with_capacity(2).reclaim(ReclaimPolicy::Overwrite);
    let harness = Harness::with_store_config(config);
    let compiled = harness.compile(&Query::new(Formula::event("H").followed_by(Formula::event("T"))));
    let mut runtime = QueryRuntime::new(&compiled, &harness.store);
    let sink = CollectingSink::new();

    harness.push(&h(1, 1.0));
    runtime.process_available(&sink).unwrap();
    harness.push(&h(2, 1.0));
    harness.push(&h(3, 1.0));
    runtime.process_available(&sink).unwrap();
    harness.push(&t(4, 1.0));
    let report = runtime.process_available(&sink).unwrap();

    assert!(report.stale_references.contains(&TupleRef::new(0)));
    assert_eq!(positions(&sink.take()), vec![vec![2, 3]]);
}

/// Readers on other threads see every tuple the writer appended
#[test]
fn test_concurrent_readers() {
    let harness = Harness::new();
    let store = Arc::clone(&harness.store);
    let compiled = Arc::new(harness.compile(&Query::new(Formula::event("H"))));

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for ts in 0..500 {
                store
                    .append(0, ts, &[AttributeValue::Double(ts as f64), AttributeValue::String("c".into())])
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let compiled = Arc::clone(&compiled);
            thread::spawn(move || {
                let mut runtime = QueryRuntime::starting_at(&compiled, &store, 0);
                let sink = CollectingSink::new();
                while sink.len() < 500 {
                    runtime.process_available(&sink).unwrap();
                    thread::yield_now();
                }
                sink.take()
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        let matches = reader.join().unwrap();
        let seen: Vec<u64> = matches.iter().map(|m| m.events[0].position).collect();
        assert_eq!(seen, (0..500).collect::<Vec<u64>>());
    }
}
