//! Broker trait definitions

use async_trait::async_trait;
use taskdash_core::Signature;
use thiserror::Error;

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors that can occur during broker operations
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Publish error
    #[error("publish error: {0}")]
    Publish(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<taskdash_core::Error> for BrokerError {
    fn from(err: taskdash_core::Error) -> Self {
        BrokerError::Serialization(err.to_string())
    }
}

/// Handle to a submitted task
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncResult {
    /// The signature as it was published, UUID and routing key filled in
    pub signature: Signature,
}

impl AsyncResult {
    pub fn new(signature: Signature) -> Self {
        Self { signature }
    }

    /// Id the queue will record the task under
    pub fn task_uuid(&self) -> &str {
        &self.signature.uuid
    }
}

/// The queue's task submission entrypoint
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    /// Publish a signature to the queue
    async fn send_task(&self, signature: Signature) -> BrokerResult<AsyncResult>;
}
