// SPDX-License-Identifier: MIT OR Apache-2.0

//! Complex events: the materialized output of a completed match

use crate::core::event::value::AttributeValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One contributing event of a match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchedEvent {
    /// Append position in the tuple store
    pub position: u64,
    pub event_type: String,
    /// Roles the event was bound to
    pub roles: Vec<String>,
    pub timestamp: i64,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl MatchedEvent {
    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, v)| v)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Immutable record of a completed match; never retracted once published
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplexEvent {
    pub query_id: Uuid,
    /// 1-based emission counter of the producing query
    pub sequence: u64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub events: Vec<MatchedEvent>,
}

impl ComplexEvent {
    pub fn positions(&self) -> Vec<u64> {
        self.events.iter().map(|e| e.position).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
