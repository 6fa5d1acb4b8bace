//! Taskdash Telemetry - Observability layer
//!
//! Structured logging for the dashboard: subscriber setup driven by
//! configuration, plus event macros that give dashboard operations a stable
//! `event` field.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};

use thiserror::Error;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
