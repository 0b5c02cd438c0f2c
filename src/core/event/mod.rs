// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod complex_event;
pub mod value;

pub use complex_event::{ComplexEvent, MatchedEvent};
pub use value::AttributeValue;
