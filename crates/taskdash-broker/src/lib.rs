//! Taskdash Broker - Queue submission layer
//!
//! This crate provides the entrypoint the dashboard re-enqueues tasks
//! through:
//! - Redis (machinery's list + delayed sorted set layout)

pub mod redis;
pub mod traits;

pub use redis::{RedisBroker, RedisBrokerConfig};
pub use traits::{AsyncResult, BrokerError, BrokerResult, TaskSubmitter};
