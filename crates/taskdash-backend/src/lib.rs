//! Taskdash Backend - Task store abstraction layer
//!
//! This crate provides the store client the dashboard reads tasks through:
//! - DynamoDB (the queue's task-state table and its state index)
//! - In-memory (local development and tests)

pub mod dynamodb;
pub mod memory;
pub mod traits;

pub use dynamodb::{DynamoDbStore, DynamoDbStoreConfig};
pub use memory::MemoryStore;
pub use traits::{
    BackendError, BackendResult, GetItemInput, GetItemOutput, KeyCondition, QueryInput,
    QueryOutput, StoreClient,
};
