//! Sensor-side primitives shared by the rule engine and the alert sinks.
//!
//! This crate provides:
//! - The OBD-II mode 01 PID catalog with label/unit metadata and decode formulas
//! - Response frame parsing for ELM327-style `"41 0C 1A F8"` lines
//! - `SensorChannel`, a named value stream with subscribe/notify delivery
//! - The `SensorInput`, `SensorListener`, and `AlertSink` contracts

pub mod frame;
pub mod pid;
pub mod sensor;

pub use frame::{parse_response, FrameError, ObdResponse};
pub use pid::{SensorSpec, StandardPid};
pub use sensor::{AlertSink, ListenerHandle, SensorChannel, SensorInput, SensorListener};
