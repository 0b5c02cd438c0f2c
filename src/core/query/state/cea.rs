// SPDX-License-Identifier: MIT OR Apache-2.0

//! Complex Event Automaton (nondeterministic)
//!
//! States carry marking transitions keyed by (event type, guard), epsilon
//! edges, and a wait flag. Stepping follows skip-till-next-match:
//!
//! - every enabled marking transition fires and the tuple joins the run,
//!   labeled with the union of the fired transitions' roles;
//! - a wait state survives without consuming the tuple only if nothing in its
//!   epsilon closure could consume it;
//! - any other state dies.
//!
//! Consuming and skipping runs end up with different tuple lists, so a step
//! reports them as two separate state sets.
//!
//! Transitions into states that cannot reach a final state are ignored and
//! state sets only ever hold such co-reachable states, so an empty set is the
//! dead configuration.

use super::automaton::{AutomatonStep, MatchAutomaton};
use crate::core::executor::bitmask::{PredicateBitmask, PredicateId};
use crate::core::stream::tuple::SchemaId;
use smallvec::SmallVec;
use std::collections::BTreeMap;

pub type StateId = u32;
pub type RoleId = u16;

/// Sorted, deduplicated set of NFA states
pub type StateSet = Vec<StateId>;

/// Sorted set of role ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(SmallVec<[RoleId; 4]>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: RoleId) {
        if let Err(at) = self.0.binary_search(&role) {
            self.0.insert(at, role);
        }
    }

    pub fn union_with(&mut self, other: &RoleSet) {
        for &role in &other.0 {
            self.insert(role);
        }
    }

    #[inline]
    pub fn contains(&self, role: RoleId) -> bool {
        self.0.binary_search(&role).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<RoleId> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleId>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

/// Conjunction of physical predicates required by a transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guard(SmallVec<[PredicateId; 4]>);

impl Guard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PredicateId) {
        if let Err(at) = self.0.binary_search(&id) {
            self.0.insert(at, id);
        }
    }

    pub fn ids(&self) -> &[PredicateId] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The empty guard is always satisfied
    #[inline]
    pub fn is_satisfied(&self, mask: &PredicateBitmask) -> bool {
        mask.contains_all(&self.0)
    }

    pub fn is_subset(&self, other: &Guard) -> bool {
        self.0.iter().all(|id| other.0.binary_search(id).is_ok())
    }
}

impl FromIterator<PredicateId> for Guard {
    fn from_iter<I: IntoIterator<Item = PredicateId>>(iter: I) -> Self {
        let mut guard = Guard::new();
        for id in iter {
            guard.insert(id);
        }
        guard
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub event_type: SchemaId,
    pub guard: Guard,
    pub roles: RoleSet,
    pub target: StateId,
}

#[derive(Debug, Clone, Default)]
struct CeaState {
    transitions: Vec<Transition>,
    epsilon: Vec<StateId>,
    wait: bool,
}

/// Incremental construction of a [`Cea`]
#[derive(Debug, Default)]
pub struct CeaBuilder {
    states: Vec<CeaState>,
    roles: Vec<String>,
}

impl CeaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(CeaState::default());
        (self.states.len() - 1) as StateId
    }

    /// State that lets irrelevant tuples pass while waiting for its continuation
    pub fn add_wait_state(&mut self) -> StateId {
        let id = self.add_state();
        self.states[id as usize].wait = true;
        id
    }

    /// Returns the index of the transition within `from`
    pub fn add_transition(&mut self, from: StateId, transition: Transition) -> usize {
        let transitions = &mut self.states[from as usize].transitions;
        transitions.push(transition);
        transitions.len() - 1
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        let epsilon = &mut self.states[from as usize].epsilon;
        if !epsilon.contains(&to) {
            epsilon.push(to);
        }
    }

    pub fn transition(&self, state: StateId, index: usize) -> &Transition {
        &self.states[state as usize].transitions[index]
    }

    pub fn transition_mut(&mut self, state: StateId, index: usize) -> &mut Transition {
        &mut self.states[state as usize].transitions[index]
    }

    /// Intern a role name
    pub fn role_id(&mut self, name: &str) -> RoleId {
        match self.find_role(name) {
            Some(id) => id,
            None => {
                self.roles.push(name.to_string());
                (self.roles.len() - 1) as RoleId
            }
        }
    }

    pub fn find_role(&self, name: &str) -> Option<RoleId> {
        self.roles
            .iter()
            .position(|r| r == name)
            .map(|i| i as RoleId)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn build(self, initial: StateId, finals: &[StateId]) -> Cea {
        let n = self.states.len();
        let mut is_final = vec![false; n];
        for &f in finals {
            is_final[f as usize] = true;
        }

        // co-reachability: walk every edge backwards from the finals
        let mut reverse: Vec<Vec<StateId>> = vec![Vec::new(); n];
        for (from, state) in self.states.iter().enumerate() {
            let targets = state
                .transitions
                .iter()
                .map(|t| t.target)
                .chain(state.epsilon.iter().copied());
            for to in targets {
                reverse[to as usize].push(from as StateId);
            }
        }
        let mut live = is_final.clone();
        let mut stack: Vec<StateId> = finals.to_vec();
        while let Some(s) = stack.pop() {
            for &p in &reverse[s as usize] {
                if !live[p as usize] {
                    live[p as usize] = true;
                    stack.push(p);
                }
            }
        }

        let closures = (0..n)
            .map(|s| epsilon_closure(&self.states, &live, s as StateId))
            .collect();

        Cea {
            states: self.states,
            initial,
            is_final,
            live,
            closures,
            roles: self.roles,
        }
    }
}

fn epsilon_closure(states: &[CeaState], live: &[bool], from: StateId) -> StateSet {
    let mut seen = vec![false; states.len()];
    let mut stack = vec![from];
    seen[from as usize] = true;
    let mut out = Vec::new();
    while let Some(s) = stack.pop() {
        if live[s as usize] {
            out.push(s);
        }
        for &next in &states[s as usize].epsilon {
            if !seen[next as usize] {
                seen[next as usize] = true;
                stack.push(next);
            }
        }
    }
    out.sort_unstable();
    out
}

/// Immutable nondeterministic automaton
#[derive(Debug, Clone)]
pub struct Cea {
    states: Vec<CeaState>,
    initial: StateId,
    is_final: Vec<bool>,
    live: Vec<bool>,
    /// Live part of each state's epsilon closure
    closures: Vec<StateSet>,
    roles: Vec<String>,
}

impl Cea {
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.is_final[state as usize]
    }

    pub fn is_wait(&self, state: StateId) -> bool {
        self.states[state as usize].wait
    }

    pub fn is_live(&self, state: StateId) -> bool {
        self.live[state as usize]
    }

    pub fn transitions(&self, state: StateId) -> &[Transition] {
        &self.states[state as usize].transitions
    }

    pub fn epsilon(&self, state: StateId) -> &[StateId] {
        &self.states[state as usize].epsilon
    }

    pub fn closure_of(&self, state: StateId) -> &[StateId] {
        &self.closures[state as usize]
    }

    pub fn role_names(&self) -> &[String] {
        &self.roles
    }

    pub fn role_name(&self, role: RoleId) -> Option<&str> {
        self.roles.get(role as usize).map(String::as_str)
    }

    /// Epsilon-closed, co-reachable set containing `states`
    pub fn closure(&self, states: impl IntoIterator<Item = StateId>) -> StateSet {
        let mut out: StateSet = states
            .into_iter()
            .flat_map(|s| self.closure_of(s).iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn initial_set(&self) -> StateSet {
        self.closure([self.initial])
    }

    pub fn is_accepting_set(&self, states: &[StateId]) -> bool {
        states.iter().any(|&s| self.is_final(s))
    }

    /// No member can consume or skip another tuple
    pub fn is_terminal_set(&self, states: &[StateId]) -> bool {
        states.iter().all(|&s| {
            !self.is_wait(s)
                && self
                    .transitions(s)
                    .iter()
                    .all(|t| !self.is_live(t.target))
        })
    }

    /// Distinct non-empty guards per event type, for every event type with a transition
    pub fn event_type_guards(&self) -> BTreeMap<SchemaId, Vec<Guard>> {
        let mut out: BTreeMap<SchemaId, Vec<Guard>> = BTreeMap::new();
        for state in &self.states {
            for t in &state.transitions {
                let guards = out.entry(t.event_type).or_default();
                if !t.guard.is_empty() && !guards.contains(&t.guard) {
                    guards.push(t.guard.clone());
                }
            }
        }
        for guards in out.values_mut() {
            guards.sort();
        }
        out
    }

    #[inline]
    fn has_enabled(&self, state: StateId, fires: &impl Fn(&Transition) -> bool) -> bool {
        self.transitions(state)
            .iter()
            .any(|t| self.is_live(t.target) && fires(t))
    }

    /// Step a state set, with `fires` deciding which transitions are enabled
    pub fn step_with(
        &self,
        states: &[StateId],
        fires: impl Fn(&Transition) -> bool,
    ) -> AutomatonStep<StateSet> {
        let mut consumed: Vec<StateId> = Vec::new();
        let mut skipped: Vec<StateId> = Vec::new();
        let mut roles = RoleSet::new();

        for &s in states {
            for t in self.transitions(s) {
                if self.is_live(t.target) && fires(t) {
                    roles.union_with(&t.roles);
                    consumed.push(t.target);
                }
            }
        }

        for &w in states {
            if self.is_wait(w)
                && !self
                    .closure_of(w)
                    .iter()
                    .any(|&q| self.has_enabled(q, &fires))
            {
                skipped.push(w);
            }
        }

        AutomatonStep {
            consumed: self.closure(consumed),
            skipped: self.closure(skipped),
            roles,
        }
    }

    /// Direct NFA step on a concrete tuple classification
    pub fn simulate_step(
        &self,
        states: &[StateId],
        event_type: SchemaId,
        mask: &PredicateBitmask,
    ) -> AutomatonStep<StateSet> {
        self.step_with(states, |t| {
            t.event_type == event_type && t.guard.is_satisfied(mask)
        })
    }
}

impl MatchAutomaton for Cea {
    type State = StateSet;
    type Symbol = (SchemaId, PredicateBitmask);

    fn classify(&self, event_type: SchemaId, mask: &PredicateBitmask) -> Self::Symbol {
        (event_type, mask.clone())
    }

    fn initial(&self) -> StateSet {
        self.initial_set()
    }

    fn step(&self, state: &StateSet, symbol: &Self::Symbol) -> AutomatonStep<StateSet> {
        self.simulate_step(state, symbol.0, &symbol.1)
    }

    fn is_dead(&self, state: &StateSet) -> bool {
        state.is_empty()
    }

    fn is_accepting(&self, state: &StateSet) -> bool {
        self.is_accepting_set(state)
    }

    fn is_terminal(&self, state: &StateSet) -> bool {
        self.is_terminal_set(state)
    }
}
