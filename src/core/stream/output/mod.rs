// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod sink;

pub use sink::{ChannelSink, CollectingSink, LogSink, MatchSink};
