//! The machinery task signature
//!
//! A signature is the full invocation descriptor of a task: name, arguments,
//! routing key, scheduled execution time and retry policy. The queue stores it
//! as JSON with PascalCase keys. [`Signature::from_json`] keeps keys this type
//! does not model in [`Signature::extra`] and [`Signature::to_json`] writes
//! them back, so re-submitting a signature never loses data. Argument values
//! keep their exact numeric text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level keys modelled by [`Signature`]
const SIGNATURE_KEYS: [&str; 17] = [
    "UUID",
    "Name",
    "RoutingKey",
    "ETA",
    "GroupUUID",
    "GroupTaskCount",
    "Args",
    "Headers",
    "Priority",
    "Immutable",
    "RetryCount",
    "RetryTimeout",
    "OnSuccess",
    "OnError",
    "ChordCallback",
    "BrokerMessageGroupId",
    "IgnoreWhenTaskNotRegistered",
];

/// A single typed task argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignatureArg {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub arg_type: String,
    pub value: Value,
}

/// A task invocation descriptor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Signature {
    #[serde(rename = "UUID", default)]
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub routing_key: String,

    /// Scheduled execution time; `None` means run as soon as possible
    #[serde(rename = "ETA", default)]
    pub eta: Option<DateTime<Utc>>,

    #[serde(rename = "GroupUUID", default)]
    pub group_uuid: String,

    #[serde(default)]
    pub group_task_count: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<SignatureArg>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, Value>,

    #[serde(default)]
    pub priority: u8,

    #[serde(default)]
    pub immutable: bool,

    #[serde(default)]
    pub retry_count: i64,

    /// Seconds to wait before the next retry
    #[serde(default)]
    pub retry_timeout: i64,

    #[serde(default)]
    pub on_success: Option<Vec<Signature>>,

    #[serde(default)]
    pub on_error: Option<Vec<Signature>>,

    #[serde(default)]
    pub chord_callback: Option<Box<Signature>>,

    #[serde(default)]
    pub broker_message_group_id: String,

    #[serde(default)]
    pub ignore_when_task_not_registered: bool,

    /// Top-level keys not modelled above, preserved verbatim
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl Signature {
    /// Create a signature for the named task
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a signature from its stored JSON form
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        let object: Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| crate::Error::Deserialization(e.to_string()))?;

        let (known, extra): (Map<String, Value>, Map<String, Value>) = object
            .into_iter()
            .partition(|(key, _)| SIGNATURE_KEYS.contains(&key.as_str()));

        let mut signature: Signature = serde_json::from_value(Value::Object(known))
            .map_err(|e| crate::Error::Deserialization(e.to_string()))?;
        signature.extra = extra;
        Ok(signature)
    }

    /// Serialize the signature to the JSON form the queue expects
    pub fn to_json(&self) -> crate::Result<String> {
        let mut value =
            serde_json::to_value(self).map_err(|e| crate::Error::Serialization(e.to_string()))?;

        if let Value::Object(object) = &mut value {
            for (key, extra) in &self.extra {
                object.entry(key.clone()).or_insert_with(|| extra.clone());
            }
        }

        serde_json::to_string(&value).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Set the routing key
    pub fn routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    /// Set the scheduled execution time
    pub fn eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }

    /// Add a positional argument
    pub fn arg(
        mut self,
        name: impl Into<String>,
        arg_type: impl Into<String>,
        value: Value,
    ) -> Self {
        self.args.push(SignatureArg {
            name: name.into(),
            arg_type: arg_type.into(),
            value,
        });
        self
    }

    /// Drop the scheduled execution time so the task runs immediately
    pub fn clear_eta(&mut self) {
        self.eta = None;
    }

    /// Check if the task is scheduled for a later time
    pub fn is_delayed(&self) -> bool {
        match self.eta {
            Some(eta) => eta > Utc::now(),
            None => false,
        }
    }
}

/// The queue writes empty lists and maps as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
