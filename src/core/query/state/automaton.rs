// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stepping interface shared by the nondeterministic and the determinized automaton
//!
//! The match enumerator only needs to classify a tuple once, step a state on
//! that symbol, and ask whether a state is dead, accepting or terminal. Both
//! automata implement it, which lets the direct NFA simulation drive the same
//! enumerator as the DetCEA.
//!
//! Every run inside one state has consumed the same tuples. A step splits the
//! runs in two: those that consumed the tuple and those that skipped it in a
//! wait state. The enumerator forks a partial match when both halves live.

use super::cea::RoleSet;
use crate::core::executor::bitmask::PredicateBitmask;
use crate::core::stream::tuple::SchemaId;
use std::fmt::Debug;

/// Result of stepping one state on one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatonStep<S> {
    /// Runs that consumed the tuple; dead if no transition fired
    pub consumed: S,
    /// Wait states that let the tuple pass; dead if none survived
    pub skipped: S,
    /// Union of the role labels of every fired transition
    pub roles: RoleSet,
}

pub trait MatchAutomaton: Send + Sync {
    type State: Clone + Debug + Send;
    type Symbol;

    /// Map an event type and its predicate bitmask to an input symbol
    fn classify(&self, event_type: SchemaId, mask: &PredicateBitmask) -> Self::Symbol;

    fn initial(&self) -> Self::State;

    fn step(&self, state: &Self::State, symbol: &Self::Symbol) -> AutomatonStep<Self::State>;

    fn is_dead(&self, state: &Self::State) -> bool;

    fn is_accepting(&self, state: &Self::State) -> bool;

    /// No further input can change the outcome of this state
    fn is_terminal(&self, state: &Self::State) -> bool;
}
