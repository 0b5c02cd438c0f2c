// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formula to CEA compilation
//!
//! Thompson-style construction over fragments. Every fragment remembers the
//! marking transitions built for it so that `AS` and `FILTER` can label or
//! guard exactly the transitions of their operand.

use super::cea::{Cea, CeaBuilder, Guard, RoleSet, StateId, Transition};
use crate::core::executor::predicate_evaluator::PredicateRegistry;
use crate::query_api::pattern::{Filter, Formula, Predicate};
use crate::sql_compiler::catalog::CatalogLookup;
use crate::sql_compiler::error::CompileError;

#[derive(Debug)]
struct Fragment {
    start: StateId,
    finals: Vec<StateId>,
    /// (source state, transition index) of every marking transition in the fragment
    marking: Vec<(StateId, usize)>,
}

pub struct FormulaCompiler<'a> {
    catalog: &'a dyn CatalogLookup,
    registry: &'a mut PredicateRegistry,
    builder: CeaBuilder,
}

impl<'a> FormulaCompiler<'a> {
    pub fn new(catalog: &'a dyn CatalogLookup, registry: &'a mut PredicateRegistry) -> Self {
        Self {
            catalog,
            registry,
            builder: CeaBuilder::new(),
        }
    }

    pub fn compile(mut self, formula: &Formula) -> Result<Cea, CompileError> {
        let fragment = self.fragment(formula)?;
        log::debug!(
            "Compiled formula {} into {} NFA states, {} predicates",
            formula,
            self.builder.state_count(),
            self.registry.len()
        );
        Ok(self.builder.build(fragment.start, &fragment.finals))
    }

    fn fragment(&mut self, formula: &Formula) -> Result<Fragment, CompileError> {
        match formula {
            Formula::EventType { name, role } => self.leaf(name, role.as_deref()),
            Formula::As(inner, role) => {
                let fragment = self.fragment(inner)?;
                let role = self.builder.role_id(role);
                for &(state, index) in &fragment.marking {
                    self.builder.transition_mut(state, index).roles.insert(role);
                }
                Ok(fragment)
            }
            Formula::ContiguousSeq(l, r) => {
                let left = self.fragment(l)?;
                let right = self.fragment(r)?;
                for &f in &left.finals {
                    self.builder.add_epsilon(f, right.start);
                }
                Ok(Self::concat(left, right))
            }
            Formula::NonContiguousSeq(l, r) => {
                let left = self.fragment(l)?;
                let right = self.fragment(r)?;
                let wait = self.builder.add_wait_state();
                for &f in &left.finals {
                    self.builder.add_epsilon(f, wait);
                }
                self.builder.add_epsilon(wait, right.start);
                Ok(Self::concat(left, right))
            }
            Formula::Or(l, r) => {
                let left = self.fragment(l)?;
                let right = self.fragment(r)?;
                let start = self.builder.add_state();
                self.builder.add_epsilon(start, left.start);
                self.builder.add_epsilon(start, right.start);
                let mut finals = left.finals;
                finals.extend(right.finals);
                let mut marking = left.marking;
                marking.extend(right.marking);
                Ok(Fragment {
                    start,
                    finals,
                    marking,
                })
            }
            Formula::ContiguousIter(inner) => {
                let fragment = self.fragment(inner)?;
                for &f in &fragment.finals {
                    self.builder.add_epsilon(f, fragment.start);
                }
                Ok(fragment)
            }
            Formula::NonContiguousIter(inner) => {
                let fragment = self.fragment(inner)?;
                let wait = self.builder.add_wait_state();
                for &f in &fragment.finals {
                    self.builder.add_epsilon(f, wait);
                }
                self.builder.add_epsilon(wait, fragment.start);
                Ok(fragment)
            }
            Formula::Filter(inner, filter) => match filter {
                Filter::Atomic {
                    variable,
                    predicate,
                } => {
                    let fragment = self.fragment(inner)?;
                    self.apply_filter(&fragment, variable, predicate)?;
                    Ok(fragment)
                }
                Filter::And(f1, f2) => {
                    let nested = Formula::Filter(
                        Box::new(Formula::Filter(inner.clone(), (**f1).clone())),
                        (**f2).clone(),
                    );
                    self.fragment(&nested)
                }
                Filter::Or(f1, f2) => {
                    let split = Formula::Or(
                        Box::new(Formula::Filter(inner.clone(), (**f1).clone())),
                        Box::new(Formula::Filter(inner.clone(), (**f2).clone())),
                    );
                    self.fragment(&split)
                }
            },
        }
    }

    fn leaf(&mut self, name: &str, role: Option<&str>) -> Result<Fragment, CompileError> {
        let info = self
            .catalog
            .event_type(name)
            .ok_or_else(|| CompileError::UnknownEventType(name.to_string()))?;
        if let Some(attr) = info.unsupported_attribute() {
            return Err(CompileError::UnsupportedFieldType {
                event_type: info.name.clone(),
                attribute: attr.name.clone(),
                attribute_type: attr.attribute_type,
            });
        }
        let start = self.builder.add_state();
        let end = self.builder.add_state();
        let mut roles = RoleSet::new();
        if let Some(role) = role {
            roles.insert(self.builder.role_id(role));
        }
        let index = self.builder.add_transition(
            start,
            Transition {
                event_type: info.id,
                guard: Guard::new(),
                roles,
                target: end,
            },
        );
        Ok(Fragment {
            start,
            finals: vec![end],
            marking: vec![(start, index)],
        })
    }

    fn concat(left: Fragment, right: Fragment) -> Fragment {
        let mut marking = left.marking;
        marking.extend(right.marking);
        Fragment {
            start: left.start,
            finals: right.finals,
            marking,
        }
    }

    /// Guard every transition bound to `variable` with `predicate`
    fn apply_filter(
        &mut self,
        fragment: &Fragment,
        variable: &str,
        predicate: &Predicate,
    ) -> Result<(), CompileError> {
        let role = self.builder.find_role(variable);
        let mut applied = 0usize;
        for &(state, index) in &fragment.marking {
            let transition = self.builder.transition(state, index);
            let info = self
                .catalog
                .event_type_by_id(transition.event_type)
                .ok_or_else(|| CompileError::UnknownEventType(transition.event_type.to_string()))?;
            let bound = info.name == variable || role.is_some_and(|r| transition.roles.contains(r));
            if !bound {
                continue;
            }
            let id = self.registry.intern(&info, predicate)?;
            self.builder.transition_mut(state, index).guard.insert(id);
            applied += 1;
        }
        if applied == 0 {
            return Err(CompileError::UnknownVariable(variable.to_string()));
        }
        Ok(())
    }
}

/// Compile `formula`, interning its predicates into `registry`
pub fn formula_to_cea(
    formula: &Formula,
    catalog: &dyn CatalogLookup,
    registry: &mut PredicateRegistry,
) -> Result<Cea, CompileError> {
    FormulaCompiler::new(catalog, registry).compile(formula)
}
