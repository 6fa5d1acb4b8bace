//! Task state and task record definitions

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeValue, Item};
use crate::signature::Signature;

/// Attribute holding the task id (table partition key)
pub const ATTR_TASK_UUID: &str = "TaskUUID";
/// Attribute holding the task state (state index hash key)
pub const ATTR_STATE: &str = "State";
/// Attribute holding the registered task name
pub const ATTR_TASK_NAME: &str = "TaskName";
/// Attribute holding the JSON-encoded signature
pub const ATTR_SIGNATURE: &str = "Signature";
/// Attribute holding the creation timestamp
pub const ATTR_CREATED_AT: &str = "CreatedAt";
/// Attribute holding the last error message
pub const ATTR_ERROR: &str = "Error";

/// The attributes fetched for every task record
pub const TASK_PROJECTION: [&str; 6] = [
    ATTR_TASK_UUID,
    ATTR_STATE,
    ATTR_TASK_NAME,
    ATTR_SIGNATURE,
    ATTR_CREATED_AT,
    ATTR_ERROR,
];

/// Current state of a task as recorded by the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Task is waiting to be processed
    Pending,
    /// Task has been received by a worker
    Received,
    /// Task is currently being executed
    Started,
    /// Task is scheduled for retry
    Retry,
    /// Task completed successfully
    Success,
    /// Task failed with an error
    Failure,
}

impl TaskState {
    /// Every state, in the order the dashboard lists them
    pub const ALL: [TaskState; 6] = [
        TaskState::Failure,
        TaskState::Pending,
        TaskState::Received,
        TaskState::Started,
        TaskState::Retry,
        TaskState::Success,
    ];

    /// The state name as stored in the task table
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Received => "RECEIVED",
            TaskState::Started => "STARTED",
            TaskState::Retry => "RETRY",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Failure
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskState::Pending),
            "RECEIVED" => Ok(TaskState::Received),
            "STARTED" => Ok(TaskState::Started),
            "RETRY" => Ok(TaskState::Retry),
            "SUCCESS" => Ok(TaskState::Success),
            "FAILURE" => Ok(TaskState::Failure),
            _ => Err(crate::Error::InvalidState(s.to_string())),
        }
    }
}

/// One row of the task-state table, limited to the projected attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub state: TaskState,
    pub task_name: String,
    /// JSON-encoded [`Signature`]
    pub signature: String,
    pub created_at: String,
    pub error: String,
}

impl TaskRecord {
    /// Map a stored item onto a task record.
    ///
    /// `TaskUUID` and `State` are required; the remaining projected
    /// attributes default to empty strings when absent.
    pub fn from_item(item: &Item) -> crate::Result<Self> {
        let task_id = required_string(item, ATTR_TASK_UUID)?;
        let state = required_string(item, ATTR_STATE)?.parse()?;

        Ok(Self {
            task_id,
            state,
            task_name: optional_string(item, ATTR_TASK_NAME)?,
            signature: optional_string(item, ATTR_SIGNATURE)?,
            created_at: optional_string(item, ATTR_CREATED_AT)?,
            error: optional_string(item, ATTR_ERROR)?,
        })
    }

    /// Convert the record back into a store item
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(ATTR_TASK_UUID.to_string(), AttributeValue::s(&self.task_id));
        item.insert(ATTR_STATE.to_string(), AttributeValue::s(self.state.as_str()));
        item.insert(ATTR_TASK_NAME.to_string(), AttributeValue::s(&self.task_name));
        item.insert(ATTR_SIGNATURE.to_string(), AttributeValue::s(&self.signature));
        item.insert(ATTR_CREATED_AT.to_string(), AttributeValue::s(&self.created_at));
        item.insert(ATTR_ERROR.to_string(), AttributeValue::s(&self.error));
        item
    }

    /// Parse the embedded signature payload
    pub fn parse_signature(&self) -> crate::Result<Signature> {
        Signature::from_json(&self.signature)
    }
}

fn required_string(item: &Item, attribute: &'static str) -> crate::Result<String> {
    match item.get(attribute) {
        Some(value) => string_value(value, attribute),
        None => Err(crate::Error::MissingAttribute { attribute }),
    }
}

fn optional_string(item: &Item, attribute: &'static str) -> crate::Result<String> {
    match item.get(attribute) {
        Some(AttributeValue::Null(_)) | None => Ok(String::new()),
        Some(value) => string_value(value, attribute),
    }
}

fn string_value(value: &AttributeValue, attribute: &'static str) -> crate::Result<String> {
    value
        .as_s()
        .map(str::to_string)
        .ok_or(crate::Error::AttributeType {
            attribute,
            expected: "S",
        })
}
