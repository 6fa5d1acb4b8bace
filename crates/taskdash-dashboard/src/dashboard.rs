//! Dashboard operations over the task store and the queue
//!
//! Listing and lookup read the task-state table; rerun resolves a stored
//! signature (or takes one directly) and hands it back to the queue.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use taskdash_backend::{GetItemInput, KeyCondition, QueryInput, StoreClient};
use taskdash_broker::{AsyncResult, TaskSubmitter};
use taskdash_core::task::{ATTR_STATE, ATTR_TASK_UUID, TASK_PROJECTION};
use taskdash_core::{
    decode_cursor, encode_cursor, AttributeValue, Item, Signature, TaskRecord, TaskState,
};
use taskdash_telemetry::{log_operation_failed, log_task_rerun, log_tasks_listed};
use tracing::debug;

use crate::{DashboardError, DashboardResult};

/// Page size used when the caller passes zero or a negative size
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<TaskRecord>,
    /// Opaque token for the following page
    pub next_cursor: Option<String>,
}

/// Operations the dashboard exposes
#[async_trait]
pub trait Dashboard: Send + Sync {
    /// List one page of tasks in `state`
    async fn find_all_tasks_by_state(
        &self,
        state: TaskState,
        cursor: Option<&str>,
        ascending: bool,
        size: i64,
    ) -> DashboardResult<TaskPage>;

    /// Look up a single task
    async fn find_task_by_id(&self, task_id: &str) -> DashboardResult<TaskRecord>;

    /// Re-submit the signature stored with a task
    async fn rerun_task(&self, task_id: &str) -> DashboardResult<AsyncResult>;

    /// Re-submit a signature supplied by the caller
    async fn rerun_signature(&self, signature: Signature) -> DashboardResult<AsyncResult>;
}

/// Where task records live
#[derive(Debug, Clone)]
pub struct TaskTables {
    pub task_states_table: String,
    pub state_index: String,
}

impl Default for TaskTables {
    fn default() -> Self {
        Self {
            task_states_table: "task_states".to_string(),
            state_index: "State-index".to_string(),
        }
    }
}

impl From<&taskdash_core::config::DynamoDbConfig> for TaskTables {
    fn from(config: &taskdash_core::config::DynamoDbConfig) -> Self {
        Self {
            task_states_table: config.task_states_table.clone(),
            state_index: config.state_index.clone(),
        }
    }
}

/// Dashboard backed by a [`StoreClient`] and a [`TaskSubmitter`]
#[derive(Clone)]
pub struct TaskDashboard {
    store: Arc<dyn StoreClient>,
    submitter: Arc<dyn TaskSubmitter>,
    tables: TaskTables,
}

impl TaskDashboard {
    pub fn new(
        store: Arc<dyn StoreClient>,
        submitter: Arc<dyn TaskSubmitter>,
        tables: TaskTables,
    ) -> Self {
        Self {
            store,
            submitter,
            tables,
        }
    }

    async fn dispatch(&self, mut signature: Signature, task_id: &str) -> DashboardResult<AsyncResult> {
        signature.clear_eta();
        let task_name = signature.name.clone();

        match self.submitter.send_task(signature).await {
            Ok(result) => {
                log_task_rerun!(task_id, task_name, result.signature.routing_key);
                Ok(result)
            }
            Err(e) => {
                log_operation_failed!("send_task", task_id, e);
                Err(DashboardError::Dispatch {
                    task_id: task_id.to_string(),
                    source: e,
                })
            }
        }
    }
}

#[async_trait]
impl Dashboard for TaskDashboard {
    async fn find_all_tasks_by_state(
        &self,
        state: TaskState,
        cursor: Option<&str>,
        ascending: bool,
        size: i64,
    ) -> DashboardResult<TaskPage> {
        let size = if size <= 0 { DEFAULT_PAGE_SIZE } else { size };
        let limit = i32::try_from(size).unwrap_or(i32::MAX);

        let start_key = match cursor.filter(|c| !c.is_empty()) {
            Some(token) => match decode_cursor(token) {
                Ok(key) => Some(key),
                Err(e) => {
                    log_operation_failed!("decode_cursor", state, e);
                    return Err(e.into());
                }
            },
            None => None,
        };

        let input = QueryInput::new(
            &self.tables.task_states_table,
            KeyCondition::eq(ATTR_STATE, state.as_str()),
        )
        .index(&self.tables.state_index)
        .projection(TASK_PROJECTION)
        .limit(limit)
        .scan_forward(ascending)
        .exclusive_start_key(start_key);

        let output = match self.store.query(input).await {
            Ok(Some(output)) => output,
            Ok(None) => {
                debug!(state = %state, "Store returned no output");
                return Ok(TaskPage::default());
            }
            Err(e) => {
                log_operation_failed!("query", state, e);
                return Err(DashboardError::Store {
                    operation: "query",
                    key: state.to_string(),
                    source: e,
                });
            }
        };

        let tasks = output
            .items
            .iter()
            .map(TaskRecord::from_item)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                log_operation_failed!("query", state, e);
                DashboardError::Deserialize {
                    key: state.to_string(),
                    message: e.to_string(),
                }
            })?;

        let next_cursor = match output.last_evaluated_key.filter(|k| !k.is_empty()) {
            Some(key) => Some(encode_cursor(&key).map_err(|e| {
                log_operation_failed!("encode_cursor", state, e);
                DashboardError::Internal(e.to_string())
            })?),
            None => None,
        };

        log_tasks_listed!(state, tasks.len(), next_cursor.is_some());

        Ok(TaskPage { tasks, next_cursor })
    }

    async fn find_task_by_id(&self, task_id: &str) -> DashboardResult<TaskRecord> {
        let mut key = Item::new();
        key.insert(ATTR_TASK_UUID.to_string(), AttributeValue::s(task_id));

        let input =
            GetItemInput::new(&self.tables.task_states_table, key).projection(TASK_PROJECTION);

        let output = self.store.get_item(input).await.map_err(|e| {
            log_operation_failed!("get_item", task_id, e);
            DashboardError::Store {
                operation: "get_item",
                key: task_id.to_string(),
                source: e,
            }
        })?;

        let item = match output.item {
            Some(item) if !item.is_empty() => item,
            _ => {
                debug!(task_id = %task_id, "Task not found");
                return Err(DashboardError::NotFound(task_id.to_string()));
            }
        };

        TaskRecord::from_item(&item).map_err(|e| {
            log_operation_failed!("get_item", task_id, e);
            DashboardError::Deserialize {
                key: task_id.to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn rerun_task(&self, task_id: &str) -> DashboardResult<AsyncResult> {
        let record = self.find_task_by_id(task_id).await?;

        let signature = record.parse_signature().map_err(|e| {
            log_operation_failed!("parse_signature", task_id, e);
            DashboardError::Deserialize {
                key: task_id.to_string(),
                message: e.to_string(),
            }
        })?;

        self.dispatch(signature, &record.task_id).await
    }

    async fn rerun_signature(&self, signature: Signature) -> DashboardResult<AsyncResult> {
        let task_id = signature.uuid.clone();
        self.dispatch(signature, &task_id).await
    }
}
