//! Taskdash Dashboard - Web API for task queue monitoring
//!
//! This crate provides the dashboard over the queue's DynamoDB task store:
//! - Paged task listing by state with opaque cursors
//! - Task lookup by id
//! - Re-running failed tasks by id or by signature

pub mod api;
pub mod dashboard;
pub mod handlers;
pub mod state;

pub use api::DashboardApi;
pub use dashboard::{Dashboard, TaskDashboard, TaskPage, TaskTables, DEFAULT_PAGE_SIZE};
pub use state::DashboardState;

use taskdash_backend::BackendError;
use taskdash_broker::BrokerError;
use taskdash_core::CursorError;
use thiserror::Error;

/// Dashboard errors
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Malformed pagination cursor; retry without it
    #[error("invalid cursor: {0}")]
    Decode(#[from] CursorError),

    /// The store call failed
    #[error("{operation} failed for {key}: {source}")]
    Store {
        operation: &'static str,
        key: String,
        #[source]
        source: BackendError,
    },

    /// Point lookup found no item
    #[error("task not found: {0}")]
    NotFound(String),

    /// Stored or embedded payload did not parse
    #[error("malformed data for {key}: {message}")]
    Deserialize { key: String, message: String },

    /// Submission to the queue failed; nothing was enqueued
    #[error("failed to send task {task_id}: {source}")]
    Dispatch {
        task_id: String,
        #[source]
        source: BrokerError,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashboardError {
    /// Check if repeating the operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DashboardError::Store { .. } | DashboardError::Dispatch { .. })
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
