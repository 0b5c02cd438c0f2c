// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query configuration: the parsed `SELECT ... FROM ... WHERE ... WITHIN ... CONSUME BY ... LIMIT`

use super::expression::IndexedVariable;
use super::pattern::{CompareOp, Formula};
use serde::{Deserialize, Serialize};

/// Maximum span of a partial match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Within {
    #[default]
    Unbounded,
    /// At most this many processed events between first and last event, inclusive
    Events(u64),
    /// Milliseconds of event time (tuple timestamps)
    EventTime(u64),
    /// Milliseconds of wall-clock ingestion time
    IngestionTime(u64),
}

/// Consumption policy: may an event contribute to more than one overlapping match?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumeBy {
    /// Keep generating further matches from the same events
    #[default]
    None,
    /// Any emitted match consumes every event seen so far
    Any,
    /// Events of an emitted match cannot take part in another overlapping
    /// match that starts with the same event type
    EventType,
}

/// Projection of the contributing events
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Select {
    #[default]
    Star,
    /// Keep only events bound to one of these variables
    Variables(Vec<String>),
}

/// Cross-event condition checked when a match completes, e.g. `S[last].v < T[0].v`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub left: IndexedVariable,
    pub op: CompareOp,
    pub right: IndexedVariable,
}

impl Correlation {
    pub fn new(left: IndexedVariable, op: CompareOp, right: IndexedVariable) -> Self {
        Self { left, op, right }
    }
}

/// A complete pattern query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub name: Option<String>,
    pub formula: Formula,
    /// Streams the query reads; empty means every event type
    pub from: Vec<String>,
    pub within: Within,
    pub consume_by: ConsumeBy,
    pub limit: Option<u64>,
    pub select: Select,
    pub correlations: Vec<Correlation>,
}

impl Query {
    pub fn new(formula: Formula) -> Self {
        Self {
            name: None,
            formula,
            from: Vec::new(),
            within: Within::Unbounded,
            consume_by: ConsumeBy::None,
            limit: None,
            select: Select::Star,
            correlations: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn from_stream(mut self, stream: impl Into<String>) -> Self {
        self.from.push(stream.into());
        self
    }

    pub fn within(mut self, within: Within) -> Self {
        self.within = within;
        self
    }

    pub fn consume_by(mut self, policy: ConsumeBy) -> Self {
        self.consume_by = policy;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    pub fn correlate(mut self, correlation: Correlation) -> Self {
        self.correlations.push(correlation);
        self
    }
}
