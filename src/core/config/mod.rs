// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod engine_config;

pub use engine_config::{AutomatonLimits, EngineConfig, ReclaimPolicy, StoreConfig};
