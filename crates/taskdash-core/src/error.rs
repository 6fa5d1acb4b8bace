//! Error types for taskdash

use thiserror::Error;

/// Result type alias using taskdash's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown task state name
    #[error("invalid task state: {0}")]
    InvalidState(String),

    /// A stored item is missing a required attribute
    #[error("missing attribute {attribute} on item")]
    MissingAttribute { attribute: &'static str },

    /// A stored attribute has the wrong type
    #[error("attribute {attribute} has unexpected type, expected {expected}")]
    AttributeType {
        attribute: &'static str,
        expected: &'static str,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Check if this error describes malformed stored data
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidState(_)
                | Error::MissingAttribute { .. }
                | Error::AttributeType { .. }
                | Error::Deserialization(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::Deserialization(err.to_string())
        } else {
            Error::Serialization(err.to_string())
        }
    }
}
