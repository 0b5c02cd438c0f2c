// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod output;
pub mod tuple;

pub use output::{ChannelSink, CollectingSink, LogSink, MatchSink};
pub use tuple::{QueryCursor, TupleRef, TupleStore, TupleView};
