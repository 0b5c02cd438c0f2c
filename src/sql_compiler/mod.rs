// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compile-time services: the event catalog, type inference and query validation

pub mod catalog;
pub mod error;
pub mod pattern_validation;
pub mod type_inference;

pub use catalog::{Catalog, CatalogLookup, EventTypeInfo};
pub use error::{CatalogError, CompileError};
pub use pattern_validation::PatternValidator;
