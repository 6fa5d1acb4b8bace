//! Structured logging for taskdash
//!
//! Provides structured logging with:
//! - Configurable log levels
//! - Environment-based filtering
//! - JSON output in production, colored output in development
//! - Dashboard event macros

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::{TelemetryError, TelemetryResult};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (json, pretty, compact)
    pub format: LogFormat,

    /// Include file/line information
    pub include_location: bool,

    /// Include target (module path)
    pub include_target: bool,

    /// Environment filter string (e.g., "taskdash=debug,tower_http=warn")
    pub env_filter: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    #[default]
    Json,
    /// Pretty format (human-readable, colored)
    Pretty,
    /// Compact format (single line)
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(TelemetryError::Config(format!("Unknown log format: {}", s))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            include_location: true,
            include_target: true,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Build from the dashboard configuration.
    ///
    /// An explicit format wins; otherwise development gets pretty output and
    /// every other environment JSON.
    pub fn from_dash_config(config: &taskdash_core::DashConfig) -> TelemetryResult<Self> {
        let format = match &config.logging.format {
            Some(format) => format.parse()?,
            None if config.is_development() => LogFormat::Pretty,
            None => LogFormat::Json,
        };

        Ok(Self {
            level: config.logging.level.clone(),
            format,
            ..Default::default()
        })
    }

    /// Build the level filter, preferring an explicit filter string
    pub fn filter(&self) -> TelemetryResult<EnvFilter> {
        if let Some(directives) = self.env_filter.as_deref() {
            return EnvFilter::try_new(directives)
                .map_err(|e| TelemetryError::Logging(e.to_string()));
        }

        let level: LevelFilter = self.level.trim().parse().map_err(|_| {
            TelemetryError::Logging(format!("unknown log level: {}", self.level))
        })?;
        Ok(EnvFilter::default().add_directive(level.into()))
    }

    /// Build the level filter, falling back to `debug` when it does not parse.
    /// The parse error is handed back so it can be logged once logging is up.
    pub fn filter_or_debug(&self) -> (EnvFilter, Option<TelemetryError>) {
        match self.filter() {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new("debug"), Some(e)),
        }
    }
}

/// Initialize logging with configuration
pub fn init_logging(config: LoggingConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let (filter, rejected) = config.filter_or_debug();
    let base = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::Logging(e.to_string()))?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    if let Some(e) = rejected {
        tracing::warn!(error = %e, "Invalid log level, using debug");
    }

    Ok(())
}

/// Log a listed page of tasks
#[macro_export]
macro_rules! log_tasks_listed {
    ($state:expr, $count:expr, $has_next:expr) => {
        tracing::debug!(
            state = %$state,
            count = $count,
            has_next = $has_next,
            event = "tasks.listed",
            "Listed tasks by state"
        )
    };
}

/// Log a task re-submitted to the queue
#[macro_export]
macro_rules! log_task_rerun {
    ($task_id:expr, $task_name:expr, $queue:expr) => {
        tracing::info!(
            task_id = %$task_id,
            task_name = %$task_name,
            queue = %$queue,
            event = "task.rerun",
            "Task re-submitted"
        )
    };
}

/// Log a failed dashboard operation
#[macro_export]
macro_rules! log_operation_failed {
    ($operation:expr, $key:expr, $error:expr) => {
        tracing::error!(
            operation = $operation,
            key = %$key,
            error = %$error,
            event = "operation.failed",
            "Dashboard operation failed"
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_follows_environment() {
        let mut dash = taskdash_core::DashConfig::default();
        assert_eq!(
            LoggingConfig::from_dash_config(&dash).unwrap().format,
            LogFormat::Json
        );

        dash.env = "development".to_string();
        assert_eq!(
            LoggingConfig::from_dash_config(&dash).unwrap().format,
            LogFormat::Pretty
        );

        dash.logging.format = Some("compact".to_string());
        assert_eq!(
            LoggingConfig::from_dash_config(&dash).unwrap().format,
            LogFormat::Compact
        );
    }

    #[test]
    fn test_invalid_filter() {
        let config = LoggingConfig {
            level: "taskdash=loud".to_string(),
            ..Default::default()
        };
        assert!(config.filter().is_err());
    }

    #[test]
    fn test_invalid_level_falls_back_to_debug() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        let (filter, rejected) = config.filter_or_debug();
        assert!(rejected.is_some());
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let (filter, rejected) = LoggingConfig::default().filter_or_debug();
        assert!(rejected.is_none());
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_disabled_logging_is_noop() {
        let config = LoggingConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(config).is_ok());
    }
}
