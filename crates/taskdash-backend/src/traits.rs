//! Store client trait definitions

use async_trait::async_trait;
use taskdash_core::{AttributeValue, Item};
use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur during backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Query against a table or index failed
    #[error("query on {table} failed: {message}")]
    Query { table: String, message: String },

    /// Point lookup failed
    #[error("get item {key} from {table} failed: {message}")]
    GetItem {
        table: String,
        key: String,
        message: String,
    },

    /// Reading or changing a table's time-to-live setting failed
    #[error("TTL update on {table} failed: {message}")]
    TimeToLive { table: String, message: String },

    /// Table or index is not known to the store
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A value could not be converted between representations
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Equality condition on a key attribute
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub attribute: String,
    pub value: AttributeValue,
}

impl KeyCondition {
    /// `attribute = value`
    pub fn eq(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Parameters of a sorted range query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInput {
    pub table_name: String,

    /// Secondary index to query; `None` queries the table itself
    pub index_name: Option<String>,

    pub key_condition: KeyCondition,

    /// Attributes to return; empty means all
    pub projection: Vec<String>,

    /// Maximum number of items to evaluate
    pub limit: Option<i32>,

    /// Ascending order when true
    pub scan_forward: bool,

    /// Resume after this key
    pub exclusive_start_key: Option<Item>,
}

impl QueryInput {
    /// Create a new query on a table
    pub fn new(table_name: impl Into<String>, key_condition: KeyCondition) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: None,
            key_condition,
            projection: Vec::new(),
            limit: None,
            scan_forward: true,
            exclusive_start_key: None,
        }
    }

    /// Query a secondary index
    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    /// Restrict the returned attributes
    pub fn projection<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the page size
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort direction
    pub fn scan_forward(mut self, ascending: bool) -> Self {
        self.scan_forward = ascending;
        self
    }

    /// Resume after a previously returned key
    pub fn exclusive_start_key(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub items: Vec<Item>,

    /// Set when the store stopped before the end of the range
    pub last_evaluated_key: Option<Item>,
}

/// Parameters of a point lookup
#[derive(Debug, Clone, PartialEq)]
pub struct GetItemInput {
    pub table_name: String,
    pub key: Item,

    /// Attributes to return; empty means all
    pub projection: Vec<String>,
}

impl GetItemInput {
    /// Look up `key` in `table_name`
    pub fn new(table_name: impl Into<String>, key: Item) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            projection: Vec::new(),
        }
    }

    /// Restrict the returned attributes
    pub fn projection<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = attributes.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of a point lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetItemOutput {
    /// `None` when no item has the requested key
    pub item: Option<Item>,
}

/// Key-value store holding the task-state table
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Run a sorted range query.
    ///
    /// `Ok(None)` means the store produced no output for the parameters.
    async fn query(&self, input: QueryInput) -> BackendResult<Option<QueryOutput>>;

    /// Fetch a single item by primary key
    async fn get_item(&self, input: GetItemInput) -> BackendResult<GetItemOutput>;
}

/// Render a key for error messages and logs
pub fn describe_key(key: &Item) -> String {
    let parts: Vec<String> = key
        .iter()
        .map(|(name, value)| match value {
            AttributeValue::S(s) | AttributeValue::N(s) => format!("{}={}", name, s),
            other => format!("{}=<{}>", name, other.type_name()),
        })
        .collect();
    parts.join(",")
}
