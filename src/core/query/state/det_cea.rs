// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic CEA built by eager subset construction
//!
//! The alphabet is partitioned per event type. Symbol 0 stands for every
//! catalog event type that no transition mentions. Each mentioned event type
//! owns a block of `2^k` symbols, one per truth assignment ("signature") of
//! the `k` distinct guards used on it. A tuple maps to exactly one symbol, so
//! the per-tuple work in the enumerator is one table lookup per partial match.

use super::automaton::{AutomatonStep, MatchAutomaton};
use super::cea::{Cea, Guard, RoleSet, StateSet, Transition};
use crate::core::config::AutomatonLimits;
use crate::core::executor::bitmask::PredicateBitmask;
use crate::core::stream::tuple::SchemaId;
use crate::sql_compiler::error::CompileError;
use std::collections::{HashMap, VecDeque};

pub type DetStateId = u32;
pub type SymbolId = u32;

/// Empty NFA state set; every symbol loops back to it
pub const DEAD_STATE: DetStateId = 0;
/// Symbol of event types the automaton never mentions
pub const OTHER_SYMBOL: SymbolId = 0;

/// Successors of one state on one symbol
///
/// `consumed` holds the runs that took the tuple and `skipped` the wait states
/// that let it pass. Either may be [`DEAD_STATE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetTransition {
    pub consumed: DetStateId,
    pub skipped: DetStateId,
    /// Index into the interned role sets
    pub roles: u32,
}

impl DetTransition {
    const DEAD: DetTransition = DetTransition {
        consumed: DEAD_STATE,
        skipped: DEAD_STATE,
        roles: 0,
    };
}

#[derive(Debug, Clone)]
pub struct DetState {
    pub nfa_states: StateSet,
    pub accepting: bool,
    pub terminal: bool,
}

#[derive(Debug, Clone)]
struct SymbolBlock {
    offset: SymbolId,
    /// Sorted distinct non-empty guards; bit i of a signature is guard i
    guards: Vec<Guard>,
}

impl SymbolBlock {
    fn signature(&self, mask: &PredicateBitmask) -> SymbolId {
        self.guards
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_satisfied(mask))
            .fold(0, |sig, (i, _)| sig | (1 << i))
    }

    /// A false guard whose predicates are all required by true guards cannot occur
    fn is_satisfiable(&self, signature: SymbolId) -> bool {
        let truth = |i: usize| signature & (1 << i) != 0;
        let mut required = Guard::new();
        for (i, g) in self.guards.iter().enumerate() {
            if truth(i) {
                for &id in g.ids() {
                    required.insert(id);
                }
            }
        }
        self.guards
            .iter()
            .enumerate()
            .all(|(i, g)| truth(i) || !g.is_subset(&required))
    }

    fn fires(&self, event_type: SchemaId, signature: SymbolId, t: &Transition) -> bool {
        if t.event_type != event_type {
            return false;
        }
        if t.guard.is_empty() {
            return true;
        }
        match self.guards.binary_search(&t.guard) {
            Ok(i) => signature & (1 << i) != 0,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetCea {
    states: Vec<DetState>,
    /// Row-major `states x symbol_count`
    table: Vec<DetTransition>,
    symbol_count: usize,
    /// Indexed by event type id; `None` for types mapped to the OTHER symbol
    blocks: Vec<Option<SymbolBlock>>,
    role_sets: Vec<RoleSet>,
    initial: DetStateId,
}

impl DetCea {
    /// Determinize `cea` over the first `event_type_count` event type ids
    pub fn determinize(
        cea: &Cea,
        event_type_count: usize,
        limits: &AutomatonLimits,
    ) -> Result<Self, CompileError> {
        let mut blocks: Vec<Option<SymbolBlock>> = vec![None; event_type_count];
        let mut symbol_count: usize = 1;
        for (event_type, guards) in cea.event_type_guards() {
            if guards.len() > limits.max_guards_per_event_type {
                return Err(CompileError::automaton_too_large(format!(
                    "event type {} uses {} distinct guards, the limit is {}",
                    event_type,
                    guards.len(),
                    limits.max_guards_per_event_type
                )));
            }
            let Some(slot) = blocks.get_mut(event_type as usize) else {
                continue;
            };
            let width = 1usize << guards.len();
            *slot = Some(SymbolBlock {
                offset: symbol_count as SymbolId,
                guards,
            });
            symbol_count += width;
        }

        let mut builder = SubsetBuilder {
            cea,
            states: Vec::new(),
            index: HashMap::new(),
            role_sets: vec![RoleSet::new()],
            role_index: HashMap::from([(RoleSet::new(), 0)]),
            queue: VecDeque::new(),
            max_states: limits.max_det_states,
        };
        builder.intern(StateSet::new())?;
        let initial = builder.intern(cea.initial_set())?;

        let mut table: Vec<DetTransition> = Vec::new();
        while let Some(id) = builder.queue.pop_front() {
            debug_assert_eq!(table.len(), id as usize * symbol_count);
            let current = builder.states[id as usize].nfa_states.clone();

            let other = cea.step_with(&current, |_| false);
            let other = builder.transition(other)?;
            table.push(other);

            for (event_type, block) in blocks.iter().enumerate() {
                let Some(block) = block else { continue };
                let event_type = event_type as SchemaId;
                for signature in 0..(1 << block.guards.len()) as SymbolId {
                    let transition = if current.is_empty() || !block.is_satisfiable(signature) {
                        DetTransition::DEAD
                    } else {
                        let step =
                            cea.step_with(&current, |t| block.fires(event_type, signature, t));
                        builder.transition(step)?
                    };
                    table.push(transition);
                }
            }
        }

        log::debug!(
            "Determinized {} NFA states into {} DFA states over {} symbols",
            cea.state_count(),
            builder.states.len(),
            symbol_count
        );

        Ok(Self {
            states: builder.states,
            table,
            symbol_count,
            blocks,
            role_sets: builder.role_sets,
            initial,
        })
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    pub fn initial(&self) -> DetStateId {
        self.initial
    }

    pub fn state(&self, id: DetStateId) -> &DetState {
        &self.states[id as usize]
    }

    pub fn role_set(&self, index: u32) -> &RoleSet {
        &self.role_sets[index as usize]
    }

    /// Symbol of a tuple; `None` when the event type was unknown at compile time
    pub fn symbol(&self, event_type: SchemaId, mask: &PredicateBitmask) -> Option<SymbolId> {
        match self.blocks.get(event_type as usize)? {
            None => Some(OTHER_SYMBOL),
            Some(block) => Some(block.offset + block.signature(mask)),
        }
    }

    #[inline]
    pub fn transition(&self, state: DetStateId, symbol: SymbolId) -> DetTransition {
        self.table[state as usize * self.symbol_count + symbol as usize]
    }
}

struct SubsetBuilder<'a> {
    cea: &'a Cea,
    states: Vec<DetState>,
    index: HashMap<StateSet, DetStateId>,
    role_sets: Vec<RoleSet>,
    role_index: HashMap<RoleSet, u32>,
    queue: VecDeque<DetStateId>,
    max_states: usize,
}

impl SubsetBuilder<'_> {
    fn intern(&mut self, set: StateSet) -> Result<DetStateId, CompileError> {
        if let Some(&id) = self.index.get(&set) {
            return Ok(id);
        }
        if self.states.len() >= self.max_states {
            return Err(CompileError::automaton_too_large(format!(
                "more than {} deterministic states",
                self.max_states
            )));
        }
        let id = self.states.len() as DetStateId;
        self.states.push(DetState {
            accepting: self.cea.is_accepting_set(&set),
            terminal: self.cea.is_terminal_set(&set),
            nfa_states: set.clone(),
        });
        self.index.insert(set, id);
        self.queue.push_back(id);
        Ok(id)
    }

    fn transition(&mut self, step: AutomatonStep<StateSet>) -> Result<DetTransition, CompileError> {
        let consumed = self.intern(step.consumed)?;
        let skipped = self.intern(step.skipped)?;
        let roles = match self.role_index.get(&step.roles) {
            Some(&i) => i,
            None => {
                let i = self.role_sets.len() as u32;
                self.role_sets.push(step.roles.clone());
                self.role_index.insert(step.roles, i);
                i
            }
        };
        Ok(DetTransition {
            consumed,
            skipped,
            roles,
        })
    }
}

impl MatchAutomaton for DetCea {
    type State = DetStateId;
    type Symbol = Option<SymbolId>;

    fn classify(&self, event_type: SchemaId, mask: &PredicateBitmask) -> Option<SymbolId> {
        self.symbol(event_type, mask)
    }

    fn initial(&self) -> DetStateId {
        self.initial
    }

    fn step(&self, state: &DetStateId, symbol: &Option<SymbolId>) -> AutomatonStep<DetStateId> {
        match symbol {
            Some(symbol) => {
                let t = self.transition(*state, *symbol);
                AutomatonStep {
                    consumed: t.consumed,
                    skipped: t.skipped,
                    roles: self.role_sets[t.roles as usize].clone(),
                }
            }
            None => AutomatonStep {
                consumed: DEAD_STATE,
                skipped: DEAD_STATE,
                roles: RoleSet::new(),
            },
        }
    }

    fn is_dead(&self, state: &DetStateId) -> bool {
        *state == DEAD_STATE
    }

    fn is_accepting(&self, state: &DetStateId) -> bool {
        self.states[*state as usize].accepting
    }

    fn is_terminal(&self, state: &DetStateId) -> bool {
        self.states[*state as usize].terminal
    }
}
