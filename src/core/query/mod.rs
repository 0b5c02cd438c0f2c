// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod query_compiler;
pub mod query_runtime;
pub mod state;

pub use query_compiler::{CompiledQuery, QueryCompiler};
pub use query_runtime::{QueryRuntime, RunReport};
