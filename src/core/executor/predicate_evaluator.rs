// SPDX-License-Identifier: MIT OR Apache-2.0

//! Physical predicates and the per-tuple bitmask evaluator
//!
//! A physical predicate is one logical predicate compiled for one event type.
//! The same logical predicate used on two event types yields two physical
//! predicates, and a physical predicate is false for tuples of any other type.

use super::bitmask::{PredicateBitmask, PredicateId};
use super::condition::PredicateExecutor;
use crate::core::stream::tuple::{SchemaId, TupleView};
use crate::query_api::pattern::Predicate;
use crate::sql_compiler::catalog::EventTypeInfo;
use crate::sql_compiler::error::CompileError;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct PhysicalPredicate {
    pub id: PredicateId,
    pub event_type: SchemaId,
    /// Negation-free source, kept for deduplication and diagnostics
    pub source: Predicate,
    executor: PredicateExecutor,
}

impl PhysicalPredicate {
    pub fn executor(&self) -> &PredicateExecutor {
        &self.executor
    }
}

/// Interns physical predicates while a query is compiled
#[derive(Debug, Default)]
pub struct PredicateRegistry {
    predicates: Vec<PhysicalPredicate>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `predicate` compiled for `event_type`, reusing an identical one
    pub fn intern(
        &mut self,
        event_type: &EventTypeInfo,
        predicate: &Predicate,
    ) -> Result<PredicateId, CompileError> {
        let source = predicate.clone().push_negations();
        if let Some(existing) = self
            .predicates
            .iter()
            .find(|p| p.event_type == event_type.id && p.source == source)
        {
            return Ok(existing.id);
        }
        let executor = PredicateExecutor::compile(&source, event_type)?;
        let id = self.predicates.len() as PredicateId;
        self.predicates.push(PhysicalPredicate {
            id,
            event_type: event_type.id,
            source,
            executor,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn get(&self, id: PredicateId) -> Option<&PhysicalPredicate> {
        self.predicates.get(id as usize)
    }

    pub fn into_evaluator(self) -> PredicateEvaluator {
        PredicateEvaluator::new(self.predicates)
    }
}

/// Computes the predicate bitmask of a tuple
#[derive(Debug)]
pub struct PredicateEvaluator {
    predicates: Vec<PhysicalPredicate>,
    /// Predicate ids grouped by event type id
    by_event_type: Vec<Vec<PredicateId>>,
    faults: AtomicU64,
}

impl PredicateEvaluator {
    pub fn new(predicates: Vec<PhysicalPredicate>) -> Self {
        let mut by_event_type: Vec<Vec<PredicateId>> = Vec::new();
        for p in &predicates {
            let slot = p.event_type as usize;
            if by_event_type.len() <= slot {
                by_event_type.resize_with(slot + 1, Vec::new);
            }
            by_event_type[slot].push(p.id);
        }
        Self {
            predicates,
            by_event_type,
            faults: AtomicU64::new(0),
        }
    }

    /// Mask width
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[PhysicalPredicate] {
        &self.predicates
    }

    pub fn evaluate(&self, tuple: &TupleView) -> PredicateBitmask {
        let mut mask = PredicateBitmask::new(self.predicates.len());
        self.evaluate_into(tuple, &mut mask);
        mask
    }

    /// Reuse `mask`'s allocation; every bit is recomputed
    pub fn evaluate_into(&self, tuple: &TupleView, mask: &mut PredicateBitmask) {
        mask.reset(self.predicates.len());
        let Some(ids) = self.by_event_type.get(tuple.schema_id() as usize) else {
            return;
        };
        for &id in ids {
            let predicate = &self.predicates[id as usize];
            match predicate.executor.execute(tuple) {
                Ok(value) => mask.set(id, value),
                Err(e) => {
                    self.faults.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "Predicate {} ({}) failed on tuple #{}: {}",
                        id,
                        predicate.source,
                        tuple.position(),
                        e
                    );
                }
            }
        }
    }

    /// Evaluation faults so far; each left its bit unset
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}
