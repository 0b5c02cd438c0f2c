// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime side of the engine: storage, evaluation, automata and query execution

pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod query;
pub mod stream;
