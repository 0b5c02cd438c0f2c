// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod formula;
pub mod predicate;

pub use formula::{Filter, Formula};
pub use predicate::{CompareOp, Predicate};
