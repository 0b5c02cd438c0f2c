// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod channel_sink;
pub mod collecting_sink;
pub mod log_sink;
pub mod sink_trait;

pub use channel_sink::ChannelSink;
pub use collecting_sink::CollectingSink;
pub use log_sink::LogSink;
pub use sink_trait::MatchSink;
