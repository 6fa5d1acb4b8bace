//! Redis broker implementation
//!
//! Publishes signatures the way the queue's own Redis broker does so
//! existing workers pick them up unchanged:
//! - The message body is the JSON-encoded signature
//! - Immediate tasks are appended to the list named by the routing key
//! - Tasks with a future ETA go to a sorted set scored by ETA in unix nanos

use crate::traits::{AsyncResult, BrokerError, BrokerResult, TaskSubmitter};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::sync::Arc;
use taskdash_core::Signature;
use tracing::{debug, info};
use uuid::Uuid;

type Connection = deadpool_redis::Connection;

/// Redis broker implementation
#[derive(Clone)]
pub struct RedisBroker {
    pool: Pool,
    config: Arc<RedisBrokerConfig>,
}

/// Configuration for Redis broker
#[derive(Debug, Clone)]
pub struct RedisBrokerConfig {
    /// Connection URL
    pub url: String,

    /// Pool size
    pub pool_size: usize,

    /// Queue used when a signature has no routing key
    pub default_queue: String,

    /// Sorted set holding delayed tasks
    pub delayed_tasks_key: String,
}

impl Default for RedisBrokerConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            default_queue: "machinery_tasks".to_string(),
            delayed_tasks_key: "delayed_tasks".to_string(),
        }
    }
}

impl From<&taskdash_core::config::BrokerConfig> for RedisBrokerConfig {
    fn from(config: &taskdash_core::config::BrokerConfig) -> Self {
        Self {
            url: config.url.clone(),
            pool_size: config.pool_size,
            default_queue: config.default_queue.clone(),
            delayed_tasks_key: config.delayed_tasks_key.clone(),
        }
    }
}

/// Where a prepared message goes
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// `RPUSH` onto this list
    Queue(String),
    /// `ZADD` into the delayed set with this score
    Delayed(i64),
}

/// A signature ready to be written to Redis
#[derive(Debug, Clone)]
pub struct Publication {
    pub signature: Signature,
    pub destination: Destination,
    pub payload: String,
}

impl RedisBroker {
    /// Create a new Redis broker with custom config
    pub async fn with_config(config: RedisBrokerConfig) -> BrokerResult<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map_err(|e| BrokerError::Connection(e.to_string()))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        info!("Connected to Redis broker at {}", config.url);

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> BrokerResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| BrokerError::Pool(e.to_string()))
    }

    /// Check if the broker answers a ping
    pub async fn is_connected(&self) -> bool {
        match self.get_conn().await {
            Ok(mut conn) => {
                let pong: Result<String, _> = redis::cmd("PING").query_async(&mut *conn).await;
                pong.is_ok()
            }
            Err(_) => false,
        }
    }

    /// Fill in defaults and decide where a signature is published
    pub fn prepare(&self, mut signature: Signature) -> BrokerResult<Publication> {
        if signature.uuid.is_empty() {
            signature.uuid = format!("task_{}", Uuid::new_v4());
        }
        if signature.routing_key.is_empty() {
            signature.routing_key = self.config.default_queue.clone();
        }

        let payload = signature.to_json()?;

        let destination = match signature.eta {
            Some(eta) if signature.is_delayed() => {
                let score = eta.timestamp_nanos_opt().ok_or_else(|| {
                    BrokerError::Publish(format!("ETA {} out of range", eta))
                })?;
                Destination::Delayed(score)
            }
            _ => Destination::Queue(signature.routing_key.clone()),
        };

        Ok(Publication {
            signature,
            destination,
            payload,
        })
    }
}

#[async_trait]
impl TaskSubmitter for RedisBroker {
    async fn send_task(&self, signature: Signature) -> BrokerResult<AsyncResult> {
        let publication = self.prepare(signature)?;
        let mut conn = self.get_conn().await?;

        match &publication.destination {
            Destination::Queue(queue) => {
                let _: i64 = conn
                    .rpush(queue, &publication.payload)
                    .await
                    .map_err(|e| BrokerError::Publish(e.to_string()))?;
                debug!(
                    task_id = %publication.signature.uuid,
                    queue = %queue,
                    "Published task"
                );
            }
            Destination::Delayed(score) => {
                let _: i64 = conn
                    .zadd(&self.config.delayed_tasks_key, &publication.payload, *score)
                    .await
                    .map_err(|e| BrokerError::Publish(e.to_string()))?;
                debug!(
                    task_id = %publication.signature.uuid,
                    score = *score,
                    "Scheduled delayed task"
                );
            }
        }

        Ok(AsyncResult::new(publication.signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn broker() -> RedisBroker {
        // The pool connects lazily, so no server is needed to build it.
        let pool = Config::from_url("redis://localhost:6379")
            .create_pool(Some(Runtime::Tokio1))
            .unwrap();
        RedisBroker {
            pool,
            config: Arc::new(RedisBrokerConfig {
                default_queue: "comment-service".to_string(),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_prepare_fills_defaults() {
        let publication = broker().prepare(Signature::new("add")).unwrap();

        assert!(publication.signature.uuid.starts_with("task_"));
        assert_eq!(publication.signature.routing_key, "comment-service");
        assert_eq!(
            publication.destination,
            Destination::Queue("comment-service".to_string())
        );

        let body: serde_json::Value = serde_json::from_str(&publication.payload).unwrap();
        assert_eq!(body["Name"], "add");
        assert_eq!(body["UUID"], publication.signature.uuid.as_str());
    }

    #[tokio::test]
    async fn test_prepare_keeps_existing_routing() {
        let signature = Signature::new("add").routing_key("dlq-comment-service");
        let publication = broker().prepare(Signature {
            uuid: "3".to_string(),
            ..signature
        })
        .unwrap();

        assert_eq!(publication.signature.uuid, "3");
        assert_eq!(
            publication.destination,
            Destination::Queue("dlq-comment-service".to_string())
        );
    }

    #[tokio::test]
    async fn test_prepare_delays_future_eta() {
        let eta = Utc::now() + chrono::Duration::minutes(5);
        let publication = broker().prepare(Signature::new("add").eta(eta)).unwrap();
        assert_eq!(
            publication.destination,
            Destination::Delayed(eta.timestamp_nanos_opt().unwrap())
        );

        let past = Utc::now() - chrono::Duration::minutes(5);
        let publication = broker().prepare(Signature::new("add").eta(past)).unwrap();
        assert!(matches!(publication.destination, Destination::Queue(_)));
    }
}
