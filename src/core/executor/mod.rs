// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod bitmask;
pub mod condition;
pub mod expression_executor;
pub mod predicate_evaluator;

pub use bitmask::{PredicateBitmask, PredicateId};
pub use condition::PredicateExecutor;
pub use expression_executor::{EvalError, ScalarExecutor};
pub use predicate_evaluator::{PhysicalPredicate, PredicateEvaluator, PredicateRegistry};
