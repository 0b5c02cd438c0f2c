// SPDX-License-Identifier: MIT OR Apache-2.0

//! # EventFlux Pattern - automaton-based complex event recognition
//!
//! Recognizes temporal patterns over a live stream of typed events and emits the
//! matching sub-sequences as they complete.
//!
//! ```text
//!  Formula + Predicates ──► QueryCompiler ──► CEA ──► DetCEA (eager subset construction)
//!                                │                       │
//!                                ▼                       ▼
//!  TupleStore ──► QueryCursor ──► PredicateEvaluator ──► MatchEnumerator ──► MatchSink
//! ```
//!
//! ## Module Organization
//!
//! - [`query_api`]: formula, predicate and expression trees, query configuration, wire format
//! - [`sql_compiler`]: catalog, type inference and pattern validation
//! - [`core`]: tuple store, executors, automata, enumerator and query runtime

pub mod core;
pub mod query_api;
pub mod sql_compiler;

pub use crate::core::config::EngineConfig;
pub use crate::core::error::{EventFluxError, EventFluxResult};
pub use crate::core::event::complex_event::{ComplexEvent, MatchedEvent};
pub use crate::core::event::value::AttributeValue;
pub use crate::core::query::query_compiler::{CompiledQuery, QueryCompiler};
pub use crate::core::query::query_runtime::QueryRuntime;
pub use crate::core::stream::tuple::{TupleRef, TupleStore, TupleView};
pub use crate::query_api::pattern::{Filter, Formula, Predicate};
pub use crate::query_api::query::{ConsumeBy, Query, Select, Within};
pub use crate::sql_compiler::catalog::{Catalog, CatalogLookup};
