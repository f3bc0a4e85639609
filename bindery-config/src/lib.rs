//! Configuration loading and tracing setup shared by Bindery binaries.
#![allow(missing_docs)]

pub mod settings;
pub mod telemetry;

pub use settings::{BinderySettings, ConfigSource};
pub use telemetry::{LogFormat, LoggingConfig, TelemetryError, init_tracing};
