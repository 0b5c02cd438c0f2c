// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod attribute;
pub mod event_definition;

pub use attribute::{Attribute, Type};
pub use event_definition::{EventDefinition, StreamDefinition};
