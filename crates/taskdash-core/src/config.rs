//! Configuration structures for taskdash

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of every environment override
const ENV_PREFIX: &str = "TASKDASH";

/// Main configuration for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    /// Deployment environment ("development", "production", ...)
    #[serde(default = "default_env")]
    pub env: String,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Task store configuration
    #[serde(default)]
    pub dynamodb: DynamoDbConfig,

    /// Queue broker configuration
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_env() -> String {
    "production".to_string()
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            server: ServerConfig::default(),
            dynamodb: DynamoDbConfig::default(),
            broker: BrokerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DashConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::Error::Configuration(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from an optional file, then apply environment overrides
    pub fn load(path: Option<impl AsRef<Path>>) -> crate::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(format!("{}_{}", ENV_PREFIX, key)).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up by key (e.g. `DYNAMODB_TASK_TABLE`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("ENV") {
            self.env = env;
        }

        // Server
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = parse_value("SERVER_PORT", &port)?;
        }

        // DynamoDB
        if let Some(region) = lookup("DYNAMODB_REGION") {
            self.dynamodb.region = region;
        }
        if let Some(endpoint) = lookup("DYNAMODB_ENDPOINT") {
            self.dynamodb.endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
        if let Some(table) = lookup("DYNAMODB_TASK_TABLE") {
            self.dynamodb.task_states_table = table;
        }
        if let Some(table) = lookup("DYNAMODB_GROUP_TABLE") {
            self.dynamodb.group_metas_table = table;
        }
        if let Some(index) = lookup("DYNAMODB_STATE_INDEX") {
            self.dynamodb.state_index = index;
        }
        if let Some(enable) = lookup("DYNAMODB_ENABLE_TTL") {
            self.dynamodb.enable_ttl = parse_value("DYNAMODB_ENABLE_TTL", &enable)?;
        }

        // Broker
        if let Some(url) = lookup("BROKER_URL") {
            self.broker.url = url;
        }
        if let Some(queue) = lookup("BROKER_DEFAULT_QUEUE") {
            self.broker.default_queue = queue;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = Some(format);
        }

        Ok(())
    }

    /// Check if running in a development environment
    pub fn is_development(&self) -> bool {
        self.env.eq_ignore_ascii_case("development")
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> crate::Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        crate::Error::Configuration(format!("Invalid value for {}_{}: {}", ENV_PREFIX, key, e))
    })
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable permissive CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: default_true(),
        }
    }
}

impl ServerConfig {
    /// Get the listen address; IPv6 hosts are bracketed
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// DynamoDB task store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamoDbConfig {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint URL (for DynamoDB Local, etc.)
    pub endpoint: Option<String>,

    /// Table holding one row per task
    #[serde(default = "default_task_table")]
    pub task_states_table: String,

    /// Table holding group metadata
    #[serde(default = "default_group_table")]
    pub group_metas_table: String,

    /// Secondary index keyed by task state
    #[serde(default = "default_state_index")]
    pub state_index: String,

    /// Enable TTL on both tables at startup
    #[serde(default)]
    pub enable_ttl: bool,

    /// Attribute DynamoDB expires items by
    #[serde(default = "default_ttl_attribute")]
    pub ttl_attribute: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_task_table() -> String {
    "task_states".to_string()
}

fn default_group_table() -> String {
    "group_metas".to_string()
}

fn default_state_index() -> String {
    "State-index".to_string()
}

fn default_ttl_attribute() -> String {
    "TTL".to_string()
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            task_states_table: default_task_table(),
            group_metas_table: default_group_table(),
            state_index: default_state_index(),
            enable_ttl: false,
            ttl_attribute: default_ttl_attribute(),
        }
    }
}

/// Queue broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Connection URL
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Queue used when a signature carries no routing key
    #[serde(default = "default_queue")]
    pub default_queue: String,

    /// Sorted set holding tasks scheduled for later
    #[serde(default = "default_delayed_tasks_key")]
    pub delayed_tasks_key: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_broker_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_queue() -> String {
    "machinery_tasks".to_string()
}

fn default_delayed_tasks_key() -> String {
    "delayed_tasks".to_string()
}

fn default_pool_size() -> usize {
    10
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            default_queue: default_queue(),
            delayed_tasks_key: default_delayed_tasks_key(),
            pool_size: default_pool_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty or compact); derived from `env` when unset
    pub format: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DashConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.dynamodb.task_states_table, "task_states");
        assert_eq!(config.dynamodb.group_metas_table, "group_metas");
        assert_eq!(config.broker.delayed_tasks_key, "delayed_tasks");
        assert!(!config.is_development());
    }

    #[test]
    fn test_partial_toml() {
        let config = DashConfig::from_toml(
            r#"
            env = "development"

            [dynamodb]
            endpoint = "http://localhost:8000"
            task_states_table = "dlq_task_states"

            [broker]
            default_queue = "comment-service"
            "#,
        )
        .unwrap();

        assert!(config.is_development());
        assert_eq!(config.dynamodb.endpoint.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.dynamodb.task_states_table, "dlq_task_states");
        assert_eq!(config.dynamodb.state_index, "State-index");
        assert_eq!(config.broker.default_queue, "comment-service");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SERVER_PORT", "9000"),
            ("DYNAMODB_TASK_TABLE", "tasks"),
            ("DYNAMODB_ENABLE_TTL", "true"),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = DashConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dynamodb.task_states_table, "tasks");
        assert!(config.dynamodb.enable_ttl);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = DashConfig::default();
        let err = config
            .apply_overrides(|key| (key == "SERVER_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TASKDASH_SERVER_PORT"));
    }
}
