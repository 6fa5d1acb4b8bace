//! Taskdash Core - Core types for the taskdash task-queue dashboard
//!
//! This crate provides the building blocks shared by every taskdash crate:
//! - Task state and task record definitions
//! - The machinery task signature
//! - Typed store attribute values
//! - The opaque pagination cursor codec
//! - Configuration structures
//! - Error types

pub mod attribute;
pub mod config;
pub mod cursor;
pub mod error;
pub mod signature;
pub mod task;

pub use attribute::{AttributeValue, Item};
pub use config::DashConfig;
pub use cursor::{decode_cursor, encode_cursor, CursorError};
pub use error::{Error, Result};
pub use signature::{Signature, SignatureArg};
pub use task::{TaskRecord, TaskState};
