// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema-typed, append-only circular buffer of packed binary tuples

pub mod cursor;
pub mod schema;
pub mod tuple_store;
pub mod tuple_view;

pub use cursor::QueryCursor;
pub use schema::{Field, FieldType, Schema, SchemaId, TUPLE_HEADER_LEN};
pub use tuple_store::{StoreStats, TupleRef, TupleStore};
pub use tuple_view::TupleView;
