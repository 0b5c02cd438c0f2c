// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query compilation: validation, CEA construction, determinization and the match plan

use crate::core::config::{AutomatonLimits, EngineConfig};
use crate::core::error::EventFluxResult;
use crate::core::executor::predicate_evaluator::{PredicateEvaluator, PredicateRegistry};
use crate::core::query::state::{formula_to_cea, Cea, DetCea, MatchEnumerator, MatchPlan};
use crate::query_api::query::Query;
use crate::query_api::wire::decode_query;
use crate::sql_compiler::catalog::CatalogLookup;
use crate::sql_compiler::error::CompileError;
use crate::sql_compiler::pattern_validation::PatternValidator;
use std::sync::Arc;
use uuid::Uuid;

/// Immutable, shareable result of compiling one query
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub id: Uuid,
    pub name: String,
    pub query: Query,
    cea: Arc<Cea>,
    det_cea: Arc<DetCea>,
    evaluator: Arc<PredicateEvaluator>,
    plan: Arc<MatchPlan>,
}

impl CompiledQuery {
    pub fn cea(&self) -> &Arc<Cea> {
        &self.cea
    }

    pub fn det_cea(&self) -> &Arc<DetCea> {
        &self.det_cea
    }

    pub fn evaluator(&self) -> &Arc<PredicateEvaluator> {
        &self.evaluator
    }

    pub fn plan(&self) -> &Arc<MatchPlan> {
        &self.plan
    }

    /// Fresh enumerator over the deterministic automaton
    pub fn enumerator(&self) -> MatchEnumerator<DetCea> {
        MatchEnumerator::new(Arc::clone(&self.det_cea), Arc::clone(&self.plan))
    }

    /// Fresh enumerator that simulates the nondeterministic automaton directly
    pub fn nfa_enumerator(&self) -> MatchEnumerator<Cea> {
        MatchEnumerator::new(Arc::clone(&self.cea), Arc::clone(&self.plan))
    }
}

pub struct QueryCompiler<'a> {
    catalog: &'a dyn CatalogLookup,
    limits: AutomatonLimits,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(catalog: &'a dyn CatalogLookup) -> Self {
        Self {
            catalog,
            limits: AutomatonLimits::default(),
        }
    }

    pub fn with_config(catalog: &'a dyn CatalogLookup, config: &EngineConfig) -> Self {
        Self {
            catalog,
            limits: config.automaton.clone(),
        }
    }

    pub fn with_limits(mut self, limits: AutomatonLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn compile(&self, query: &Query) -> Result<CompiledQuery, CompileError> {
        PatternValidator::validate(query, self.catalog)?;

        let mut registry = PredicateRegistry::new();
        let cea = formula_to_cea(&query.formula, self.catalog, &mut registry)?;
        let det_cea = DetCea::determinize(&cea, self.catalog.event_type_count(), &self.limits)?;

        let id = Uuid::new_v4();
        let plan = MatchPlan::new(id, query, &cea, self.catalog)?;
        let evaluator = registry.into_evaluator();

        log::debug!(
            "Compiled query '{}': {} predicates, {} NFA states, {} DFA states, {} symbols",
            plan.name,
            evaluator.len(),
            cea.state_count(),
            det_cea.state_count(),
            det_cea.symbol_count()
        );

        Ok(CompiledQuery {
            id,
            name: plan.name.clone(),
            query: query.clone(),
            cea: Arc::new(cea),
            det_cea: Arc::new(det_cea),
            evaluator: Arc::new(evaluator),
            plan: Arc::new(plan),
        })
    }

    /// Decode a query from its wire form and compile it
    pub fn compile_wire(&self, bytes: &[u8]) -> EventFluxResult<CompiledQuery> {
        let query = decode_query(bytes)?;
        Ok(self.compile(&query)?)
    }
}
