//! Foundry Telemetry - structured logging setup

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig, DEFAULT_FILTER};
