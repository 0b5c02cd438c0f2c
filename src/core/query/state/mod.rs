// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automata and match enumeration
//!
//! A formula compiles into a [`Cea`], which is determinized into a
//! [`DetCea`]. The [`MatchEnumerator`] runs either of them through the
//! [`MatchAutomaton`] interface.

pub mod automaton;
pub mod cea;
pub mod det_cea;
pub mod formula_to_cea;
pub mod match_enumerator;
pub mod partial_match;

pub use automaton::{AutomatonStep, MatchAutomaton};
pub use cea::{Cea, CeaBuilder, Guard, RoleId, RoleSet, StateId, StateSet, Transition};
pub use det_cea::{DetCea, DetStateId, SymbolId, DEAD_STATE, OTHER_SYMBOL};
pub use formula_to_cea::{formula_to_cea, FormulaCompiler};
pub use match_enumerator::{EnumeratorStats, MatchEnumerator, MatchPlan, ProcessOutcome, VariableBinding};
pub use partial_match::{MatchedTuple, PartialMatch};
