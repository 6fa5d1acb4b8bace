//! Typed store attribute values
//!
//! Mirrors the DynamoDB data model so items, keys and cursors can be handled
//! without depending on the AWS SDK. Values serialize in DynamoDB JSON form,
//! e.g. `{"S": "FAILURE"}`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// An item or key: attribute name to value, ordered by name
pub type Item = BTreeMap<String, AttributeValue>;

/// A single typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    #[serde(rename = "S")]
    S(String),
    /// Number, kept in its decimal string form
    #[serde(rename = "N")]
    N(String),
    /// Binary
    #[serde(rename = "B")]
    B(Vec<u8>),
    /// Boolean
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Null marker
    #[serde(rename = "NULL")]
    Null(bool),
    /// List of values
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    /// Nested map
    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),
    /// String set
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    /// Number set
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    /// Binary set
    #[serde(rename = "BS")]
    Bs(Vec<Vec<u8>>),
}

impl AttributeValue {
    /// Build a string value
    pub fn s(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    /// Build a number value
    pub fn n(value: impl ToString) -> Self {
        AttributeValue::N(value.to_string())
    }

    /// Borrow the string payload, if this is a string
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// DynamoDB type descriptor of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
            AttributeValue::Bs(_) => "BS",
        }
    }

    /// Order two key values the way a sorted index does.
    ///
    /// Only scalar key types (`S`, `N`, `B`) of the same kind are comparable.
    pub fn key_cmp(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
            (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
            (AttributeValue::N(a), AttributeValue::N(b)) => {
                match (a.parse::<f64>(), b.parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.partial_cmp(&y),
                    _ => Some(a.cmp(b)),
                }
            }
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::S(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::S(s)
    }
}
