// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for the integration tests
//!
//! Event types:
//! - `H` (temp DOUBLE, city STRING)
//! - `T` (temp DOUBLE, city STRING)
//! - `S` (value LONG)
//! - `X` (value LONG): noise that patterns only mention when a test says so
//!
//! Stream `Weather` groups `H` and `T`.

#![allow(dead_code)]

use eventflux_pattern::core::config::StoreConfig;
use eventflux_pattern::core::stream::output::CollectingSink;
use eventflux_pattern::query_api::definition::{EventDefinition, StreamDefinition, Type};
use eventflux_pattern::{
    AttributeValue, Catalog, CatalogLookup, CompiledQuery, ComplexEvent, Query, QueryCompiler,
    QueryRuntime, TupleRef, TupleStore,
};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    for name in ["H", "T"] {
        catalog
            .register_event_type(
                EventDefinition::new(name)
                    .attribute("temp", Type::DOUBLE)
                    .attribute("city", Type::STRING),
            )
            .unwrap();
    }
    for name in ["S", "X"] {
        catalog
            .register_event_type(EventDefinition::new(name).attribute("value", Type::LONG))
            .unwrap();
    }
    catalog
        .register_stream(StreamDefinition::new("Weather").event_type("H").event_type("T"))
        .unwrap();
    catalog
}

/// One input event: type name, timestamp, field values
pub type Input = (&'static str, i64, Vec<AttributeValue>);

pub fn h(ts: i64, temp: f64) -> Input {
    ("H", ts, vec![AttributeValue::Double(temp), AttributeValue::String("Paris".into())])
}

pub fn h_in(ts: i64, temp: f64, city: &str) -> Input {
    ("H", ts, vec![AttributeValue::Double(temp), AttributeValue::String(city.into())])
}

pub fn t(ts: i64, temp: f64) -> Input {
    ("T", ts, vec![AttributeValue::Double(temp), AttributeValue::String("Paris".into())])
}

pub fn s(ts: i64, value: i64) -> Input {
    ("S", ts, vec![AttributeValue::Long(value)])
}

pub fn x(ts: i64) -> Input {
    ("X", ts, vec![AttributeValue::Long(0)])
}

pub struct Harness {
    pub catalog: Catalog,
    pub store: Arc<TupleStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store_config(StoreConfig::default())
    }

    pub fn with_store_config(config: StoreConfig) -> Self {
        init_logging();
        let catalog = catalog();
        let store = TupleStore::new(&catalog, config);
        Self { catalog, store }
    }

    pub fn push(&self, input: &Input) -> TupleRef {
        let (name, ts, values) = input;
        let id = self.catalog.event_type(name).unwrap().id;
        self.store.append(id, *ts, values).unwrap()
    }

    pub fn compile(&self, query: &Query) -> CompiledQuery {
        QueryCompiler::new(&self.catalog).compile(query).unwrap()
    }

    /// Compile `query`, append `inputs` and return every emitted match
    pub fn run(&self, query: &Query, inputs: &[Input]) -> Vec<ComplexEvent> {
        let compiled = self.compile(query);
        let mut runtime = QueryRuntime::new(&compiled, &self.store);
        for input in inputs {
            self.push(input);
        }
        let sink = CollectingSink::new();
        runtime.process_available(&sink).unwrap();
        sink.take()
    }
}

/// Store positions of each match, in emission order
pub fn positions(matches: &[ComplexEvent]) -> Vec<Vec<u64>> {
    matches.iter().map(ComplexEvent::positions).collect()
}
