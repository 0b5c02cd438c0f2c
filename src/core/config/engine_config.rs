// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Engine Configuration
//!
//! Store sizing and automaton ceilings, loaded from TOML or built in code.
//! Every section and key is optional; missing values fall back to the defaults.
//!
//! ```toml
//! [store]
//! capacity = 65536
//! reclaim = "reject"      # or "overwrite"
//!
//! [automaton]
//! max_det_states = 65536
//! max_guards_per_event_type = 12
//! ```

use crate::core::error::{EventFluxError, EventFluxResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Upper bound for `max_guards_per_event_type`; each event type owns `2^k` DetCEA symbols
pub const MAX_GUARDS_LIMIT: usize = 20;

/// What the store does when the slot to overwrite is still pinned by a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReclaimPolicy {
    /// Fail the append with `Backpressure`
    #[default]
    Reject,
    /// Overwrite anyway; late readers see `StaleReference`
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of tuple slots in the ring
    pub capacity: usize,
    pub reclaim: ReclaimPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 65_536,
            reclaim: ReclaimPolicy::Reject,
        }
    }
}

impl StoreConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn reclaim(mut self, reclaim: ReclaimPolicy) -> Self {
        self.reclaim = reclaim;
        self
    }
}

/// Ceilings applied while determinizing a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonLimits {
    pub max_det_states: usize,
    /// Distinct guards on one event type; the symbol space grows as 2^n
    pub max_guards_per_event_type: usize,
}

impl Default for AutomatonLimits {
    fn default() -> Self {
        Self {
            max_det_states: 65_536,
            max_guards_per_event_type: 12,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub automaton: AutomatonLimits,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> EventFluxResult<Self> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| {
            EventFluxError::configuration(format!("Failed to parse engine config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> EventFluxResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("Loading engine config from {:?}", path);
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> EventFluxResult<()> {
        if self.store.capacity == 0 {
            return Err(EventFluxError::configuration_with_key(
                "store capacity must be at least 1",
                "store.capacity",
            ));
        }
        if self.automaton.max_det_states < 2 {
            // the dead state always takes one slot
            return Err(EventFluxError::configuration_with_key(
                "max_det_states must be at least 2",
                "automaton.max_det_states",
            ));
        }
        if self.automaton.max_guards_per_event_type == 0
            || self.automaton.max_guards_per_event_type > MAX_GUARDS_LIMIT
        {
            return Err(EventFluxError::configuration_with_key(
                format!(
                    "max_guards_per_event_type must be between 1 and {}",
                    MAX_GUARDS_LIMIT
                ),
                "automaton.max_guards_per_event_type",
            ));
        }
        Ok(())
    }
}
