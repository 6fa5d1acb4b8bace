//! Common test utilities and fixtures

use async_trait::async_trait;
use std::sync::{Mutex, Once};
use std::time::Duration;
use taskdash_backend::MemoryStore;
use taskdash_broker::{AsyncResult, BrokerResult, TaskSubmitter};
use taskdash_core::{Signature, TaskRecord, TaskState};

static INIT: Once = Once::new();

/// Table and index names used by the fixtures
pub const TASK_TABLE: &str = "task_states";
pub const STATE_INDEX: &str = "State-index";

/// Initialize test environment (logging, etc.)
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("taskdash=debug")
            .try_init();
    });
}

async fn port_open(addr: &str) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_secs(1), tokio::net::TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Check if Redis is available for integration tests
pub async fn redis_available() -> bool {
    port_open("localhost:6379").await
}

/// Check if DynamoDB Local is available for integration tests
pub async fn dynamodb_available() -> bool {
    port_open("localhost:8000").await
}

/// Generate a unique name with a short random suffix
pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Generate a unique task ID
pub fn unique_task_id() -> String {
    format!("task_{}", uuid::Uuid::new_v4())
}

/// A stored task whose signature routes to `queue`
pub fn task_record(task_id: &str, state: TaskState, queue: &str) -> TaskRecord {
    let signature = Signature {
        uuid: task_id.to_string(),
        ..Signature::new("resize_image")
            .routing_key(queue)
            .arg("path", "string", serde_json::Value::from("s3://bucket/a.png"))
    };

    TaskRecord {
        task_id: task_id.to_string(),
        state,
        task_name: signature.name.clone(),
        signature: signature.to_json().expect("fixture signature serializes"),
        created_at: "2024-05-01T12:00:00Z".to_string(),
        error: if state == TaskState::Failure {
            "timeout".to_string()
        } else {
            String::new()
        },
    }
}

/// Memory store with the task table and state index created
pub async fn task_store(records: &[TaskRecord]) -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table(TASK_TABLE, "TaskUUID").await;
    store
        .create_index(TASK_TABLE, STATE_INDEX, "State", None)
        .await
        .expect("failed to create state index");
    for record in records {
        store
            .put_item(TASK_TABLE, record.to_item())
            .await
            .expect("failed to seed task");
    }
    store
}

/// Submitter that records every signature instead of publishing it
#[derive(Default)]
pub struct RecordingSubmitter {
    sent: Mutex<Vec<Signature>>,
}

impl RecordingSubmitter {
    /// Signatures submitted so far
    pub fn sent(&self) -> Vec<Signature> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskSubmitter for RecordingSubmitter {
    async fn send_task(&self, signature: Signature) -> BrokerResult<AsyncResult> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(signature.clone());
        }
        Ok(AsyncResult::new(signature))
    }
}
