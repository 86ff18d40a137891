//! Alert delivery.
//!
//! Rules report a satisfied condition through the `AlertSink` contract;
//! this crate provides the sinks: structured log output, an in-memory
//! buffer for tests, a JSONL journal file and a fan-out combinator.
//! Sinks never propagate delivery failures back into the evaluation path.

pub mod event;
pub mod fanout;
pub mod journal;
pub mod log;
pub mod memory;

pub use event::AlertEvent;
pub use fanout::FanoutSink;
pub use journal::{JsonlSink, SinkError};
pub use log::LogSink;
pub use memory::MemorySink;
