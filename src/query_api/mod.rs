// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query API - the language-independent trees handed over by a parser
//!
//! Everything in here is plain data: closed tagged enums that serialize with
//! serde and carry no runtime state.

pub mod definition;
pub mod expression;
pub mod pattern;
pub mod query;
pub mod wire;
