//! DynamoDB task store implementation
//!
//! Reads the task-state table written by the queue's DynamoDB result
//! backend. Range queries go through the state secondary index; point
//! lookups hit the table's `TaskUUID` partition key. Every attribute name in
//! an expression is referenced through a `#aN` placeholder because `State`
//! and `Error` are DynamoDB reserved words.

use crate::traits::{
    describe_key, BackendError, BackendResult, GetItemInput, GetItemOutput, QueryInput,
    QueryOutput, StoreClient,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::{
    config::Region,
    error::DisplayErrorContext,
    primitives::Blob,
    types::{AttributeValue as SdkValue, TimeToLiveSpecification, TimeToLiveStatus},
    Client,
};
use std::collections::HashMap;
use taskdash_core::{AttributeValue, Item};
use tracing::{debug, info};

type SdkItem = HashMap<String, SdkValue>;

/// DynamoDB store implementation
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

/// Configuration for the DynamoDB store
#[derive(Debug, Clone)]
pub struct DynamoDbStoreConfig {
    /// AWS region
    pub region: String,

    /// Custom endpoint URL (for DynamoDB Local, etc.)
    pub endpoint_url: Option<String>,
}

impl Default for DynamoDbStoreConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }
}

impl From<&taskdash_core::config::DynamoDbConfig> for DynamoDbStoreConfig {
    fn from(config: &taskdash_core::config::DynamoDbConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint_url: config.endpoint.clone(),
        }
    }
}

impl DynamoDbStore {
    /// Wrap a pre-built DynamoDB client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a store from the AWS default provider chain
    pub async fn with_config(config: DynamoDbStoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        info!(
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            "Configured DynamoDB task store"
        );

        Self::new(Client::new(&aws_config))
    }

    /// Enable time-to-live on `table` using `attribute`, unless it is
    /// already enabled or being enabled
    pub async fn ensure_ttl(&self, table: &str, attribute: &str) -> BackendResult<()> {
        let desc = self
            .client
            .describe_time_to_live()
            .table_name(table)
            .send()
            .await
            .map_err(|e| ttl_error(table, DisplayErrorContext(&e)))?;

        let status = desc
            .time_to_live_description()
            .and_then(|d| d.time_to_live_status());
        if matches!(
            status,
            Some(TimeToLiveStatus::Enabled) | Some(TimeToLiveStatus::Enabling)
        ) {
            debug!(table, "TTL already enabled");
            return Ok(());
        }

        info!(table, attribute, "Enabling TTL on table");
        let spec = TimeToLiveSpecification::builder()
            .enabled(true)
            .attribute_name(attribute)
            .build()
            .map_err(|e| ttl_error(table, e))?;

        let out = self
            .client
            .update_time_to_live()
            .table_name(table)
            .time_to_live_specification(spec)
            .send()
            .await
            .map_err(|e| ttl_error(table, DisplayErrorContext(&e)))?;

        let enabled = out
            .time_to_live_specification()
            .map(|s| s.enabled())
            .unwrap_or(false);
        if !enabled {
            return Err(ttl_error(table, "time to live was not enabled"));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreClient for DynamoDbStore {
    async fn query(&self, input: QueryInput) -> BackendResult<Option<QueryOutput>> {
        let mut names = ExpressionNames::default();
        let key_name = names.placeholder(&input.key_condition.attribute);

        let mut request = self
            .client
            .query()
            .table_name(&input.table_name)
            .set_index_name(input.index_name.clone())
            .key_condition_expression(format!("{} = :key", key_name))
            .expression_attribute_values(":key", to_sdk(&input.key_condition.value))
            .scan_index_forward(input.scan_forward)
            .set_limit(input.limit)
            .set_exclusive_start_key(input.exclusive_start_key.as_ref().map(to_sdk_item));

        if !input.projection.is_empty() {
            request = request.projection_expression(names.projection(&input.projection));
        }

        let output = request
            .set_expression_attribute_names(Some(names.into_map()))
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|s| s.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    BackendError::ResourceNotFound(input.table_name.clone())
                } else {
                    BackendError::Query {
                        table: input.table_name.clone(),
                        message: DisplayErrorContext(&e).to_string(),
                    }
                }
            })?;

        let items = output
            .items()
            .iter()
            .map(from_sdk_item)
            .collect::<BackendResult<Vec<_>>>()?;

        let last_evaluated_key = match output.last_evaluated_key() {
            Some(key) if !key.is_empty() => Some(from_sdk_item(key)?),
            _ => None,
        };

        debug!(
            table = %input.table_name,
            index = input.index_name.as_deref().unwrap_or("-"),
            count = items.len(),
            more = last_evaluated_key.is_some(),
            "Query completed"
        );

        Ok(Some(QueryOutput {
            items,
            last_evaluated_key,
        }))
    }

    async fn get_item(&self, input: GetItemInput) -> BackendResult<GetItemOutput> {
        let mut request = self
            .client
            .get_item()
            .table_name(&input.table_name)
            .set_key(Some(to_sdk_item(&input.key)));

        if !input.projection.is_empty() {
            let mut names = ExpressionNames::default();
            request = request
                .projection_expression(names.projection(&input.projection))
                .set_expression_attribute_names(Some(names.into_map()));
        }

        let output = request.send().await.map_err(|e| BackendError::GetItem {
            table: input.table_name.clone(),
            key: describe_key(&input.key),
            message: DisplayErrorContext(&e).to_string(),
        })?;

        let item = output.item().map(from_sdk_item).transpose()?;
        Ok(GetItemOutput { item })
    }
}

/// Placeholder allocation for `ExpressionAttributeNames`
#[derive(Debug, Default)]
struct ExpressionNames {
    names: Vec<String>,
}

impl ExpressionNames {
    /// Placeholder for `attribute`, allocating one on first use
    fn placeholder(&mut self, attribute: &str) -> String {
        let index = match self.names.iter().position(|n| n == attribute) {
            Some(index) => index,
            None => {
                self.names.push(attribute.to_string());
                self.names.len() - 1
            }
        };
        format!("#a{}", index)
    }

    /// Projection expression over `attributes`
    fn projection(&mut self, attributes: &[String]) -> String {
        attributes
            .iter()
            .map(|a| self.placeholder(a))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn into_map(self) -> HashMap<String, String> {
        self.names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (format!("#a{}", i), name))
            .collect()
    }
}

fn ttl_error(table: &str, message: impl std::fmt::Display) -> BackendError {
    BackendError::TimeToLive {
        table: table.to_string(),
        message: message.to_string(),
    }
}

/// Convert a store value into its SDK form
pub fn to_sdk(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::B(b) => SdkValue::B(Blob::new(b.clone())),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null(b) => SdkValue::Null(*b),
        AttributeValue::L(values) => SdkValue::L(values.iter().map(to_sdk).collect()),
        AttributeValue::M(map) => SdkValue::M(to_sdk_item(map)),
        AttributeValue::Ss(values) => SdkValue::Ss(values.clone()),
        AttributeValue::Ns(values) => SdkValue::Ns(values.clone()),
        AttributeValue::Bs(values) => {
            SdkValue::Bs(values.iter().map(|b| Blob::new(b.clone())).collect())
        }
    }
}

/// Convert an SDK value into a store value
pub fn from_sdk(value: &SdkValue) -> BackendResult<AttributeValue> {
    Ok(match value {
        SdkValue::S(s) => AttributeValue::S(s.clone()),
        SdkValue::N(n) => AttributeValue::N(n.clone()),
        SdkValue::B(b) => AttributeValue::B(b.as_ref().to_vec()),
        SdkValue::Bool(b) => AttributeValue::Bool(*b),
        SdkValue::Null(b) => AttributeValue::Null(*b),
        SdkValue::L(values) => {
            AttributeValue::L(values.iter().map(from_sdk).collect::<BackendResult<_>>()?)
        }
        SdkValue::M(map) => AttributeValue::M(from_sdk_item(map)?),
        SdkValue::Ss(values) => AttributeValue::Ss(values.clone()),
        SdkValue::Ns(values) => AttributeValue::Ns(values.clone()),
        SdkValue::Bs(values) => {
            AttributeValue::Bs(values.iter().map(|b| b.as_ref().to_vec()).collect())
        }
        other => {
            return Err(BackendError::Conversion(format!(
                "unsupported attribute value {:?}",
                other
            )))
        }
    })
}

fn to_sdk_item(item: &Item) -> SdkItem {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk(value)))
        .collect()
}

fn from_sdk_item(item: &SdkItem) -> BackendResult<Item> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), from_sdk(value)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expression_names_share_placeholders() {
        let mut names = ExpressionNames::default();
        assert_eq!(names.placeholder("State"), "#a0");

        let projection: Vec<String> = ["TaskUUID", "State", "Error"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names.projection(&projection), "#a1, #a0, #a2");

        let map = names.into_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map["#a0"], "State");
        assert_eq!(map["#a2"], "Error");
    }

    #[test]
    fn test_sdk_conversion_preserves_nested_values() {
        let mut nested = Item::new();
        nested.insert("count".to_string(), AttributeValue::n(2));
        nested.insert("raw".to_string(), AttributeValue::B(vec![1, 2, 3]));

        let value = AttributeValue::L(vec![
            AttributeValue::s("FAILURE"),
            AttributeValue::M(nested),
            AttributeValue::Null(true),
            AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]),
        ]);

        assert_eq!(from_sdk(&to_sdk(&value)).unwrap(), value);
    }

    #[tokio::test]
    async fn test_ttl_failure_is_reported_as_ttl_error() {
        use aws_sdk_dynamodb::config::{retry::RetryConfig, Credentials};

        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .credentials_provider(Credentials::new("local", "local", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .build();
        let store = DynamoDbStore::new(Client::from_conf(config));

        let err = store.ensure_ttl("task_states", "TTL").await.unwrap_err();
        match err {
            BackendError::TimeToLive { table, .. } => assert_eq!(table, "task_states"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
