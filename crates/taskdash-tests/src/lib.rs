//! Taskdash Integration Tests
//!
//! This crate contains integration tests that run the dashboard end to end.
//! Run with: `cargo test -p taskdash-tests`
//!
//! For tests that require DynamoDB Local and Redis:
//! ```sh
//! docker run -d -p 8000:8000 amazon/dynamodb-local
//! docker run -d -p 6379:6379 redis:7-alpine
//! cargo test -p taskdash-tests -- --ignored
//! ```

pub mod common;
