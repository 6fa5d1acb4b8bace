//! In-memory store implementation
//!
//! Emulates the subset of DynamoDB the dashboard relies on: tables keyed by a
//! single partition attribute, secondary indexes with a hash key and an
//! optional range key, sorted index queries with limit / direction /
//! exclusive start key, and projections. Unlike DynamoDB, a last evaluated
//! key is only returned when more matching items remain.

use crate::traits::{
    BackendError, BackendResult, GetItemInput, GetItemOutput, QueryInput, QueryOutput,
    StoreClient,
};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use taskdash_core::{AttributeValue, Item};
use tokio::sync::RwLock;

/// Secondary index definition
#[derive(Debug, Clone)]
struct IndexDef {
    hash_key: String,
    range_key: Option<String>,
}

/// One table and its indexes
#[derive(Debug, Clone)]
struct Table {
    partition_key: String,
    indexes: HashMap<String, IndexDef>,
    items: Vec<Item>,
}

impl Table {
    fn primary_value<'a>(&self, item: &'a Item) -> Option<&'a AttributeValue> {
        item.get(&self.partition_key)
    }

    /// Attributes that make up a last evaluated key for `index`
    fn key_attributes(&self, index: Option<&IndexDef>) -> Vec<String> {
        let mut attrs = vec![self.partition_key.clone()];
        if let Some(index) = index {
            for attr in std::iter::once(&index.hash_key).chain(index.range_key.as_ref()) {
                if !attrs.contains(attr) {
                    attrs.push(attr.clone());
                }
            }
        }
        attrs
    }
}

/// In-memory store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a table keyed by `partition_key`
    pub async fn create_table(&self, name: &str, partition_key: &str) {
        let mut tables = self.tables.write().await;
        tables.insert(
            name.to_string(),
            Table {
                partition_key: partition_key.to_string(),
                indexes: HashMap::new(),
                items: Vec::new(),
            },
        );
    }

    /// Define a secondary index on an existing table
    pub async fn create_index(
        &self,
        table: &str,
        index: &str,
        hash_key: &str,
        range_key: Option<&str>,
    ) -> BackendResult<()> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::ResourceNotFound(table.to_string()))?;

        table.indexes.insert(
            index.to_string(),
            IndexDef {
                hash_key: hash_key.to_string(),
                range_key: range_key.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Insert or replace an item
    pub async fn put_item(&self, table: &str, item: Item) -> BackendResult<()> {
        let mut tables = self.tables.write().await;
        let table_ref = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::ResourceNotFound(table.to_string()))?;

        let key = table_ref.primary_value(&item).cloned().ok_or_else(|| {
            BackendError::Conversion(format!(
                "item is missing partition key {}",
                table_ref.partition_key
            ))
        })?;

        let partition_key = table_ref.partition_key.clone();
        table_ref
            .items
            .retain(|existing| existing.get(&partition_key) != Some(&key));
        table_ref.items.push(item);
        Ok(())
    }

    /// Number of items in a table
    pub async fn len(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(|t| t.items.len()).unwrap_or(0)
    }
}

fn compare_by(a: &Item, b: &Item, attribute: &str) -> Ordering {
    match (a.get(attribute), b.get(attribute)) {
        (Some(x), Some(y)) => x.key_cmp(y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn project(item: &Item, projection: &[String]) -> Item {
    if projection.is_empty() {
        return item.clone();
    }
    item.iter()
        .filter(|(name, _)| projection.iter().any(|p| p == *name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn extract_key(item: &Item, attributes: &[String]) -> Item {
    attributes
        .iter()
        .filter_map(|a| item.get(a).map(|v| (a.clone(), v.clone())))
        .collect()
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn query(&self, input: QueryInput) -> BackendResult<Option<QueryOutput>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&input.table_name)
            .ok_or_else(|| BackendError::ResourceNotFound(input.table_name.clone()))?;

        let index = match &input.index_name {
            Some(name) => Some(table.indexes.get(name).ok_or_else(|| {
                BackendError::ResourceNotFound(format!("{}/{}", input.table_name, name))
            })?),
            None => None,
        };

        let hash_key = index
            .map(|i| i.hash_key.as_str())
            .unwrap_or(table.partition_key.as_str());
        if input.key_condition.attribute != hash_key {
            return Err(BackendError::Query {
                table: input.table_name.clone(),
                message: format!(
                    "key condition must target hash key {}, got {}",
                    hash_key, input.key_condition.attribute
                ),
            });
        }

        let mut matches: Vec<&Item> = table
            .items
            .iter()
            .filter(|item| item.get(hash_key) == Some(&input.key_condition.value))
            .collect();

        let range_key = index.and_then(|i| i.range_key.as_deref());
        matches.sort_by(|a, b| {
            range_key
                .map(|r| compare_by(a, b, r))
                .unwrap_or(Ordering::Equal)
                .then_with(|| compare_by(a, b, &table.partition_key))
        });
        if !input.scan_forward {
            matches.reverse();
        }

        let key_attributes = table.key_attributes(index);
        let start = match &input.exclusive_start_key {
            Some(start_key) => {
                let position = matches
                    .iter()
                    .position(|item| &extract_key(item, &key_attributes) == start_key)
                    .ok_or_else(|| BackendError::Query {
                        table: input.table_name.clone(),
                        message: "exclusive start key does not match any item".to_string(),
                    })?;
                position + 1
            }
            None => 0,
        };

        let remaining = &matches[start.min(matches.len())..];
        let limit = match input.limit {
            Some(limit) if limit > 0 => limit as usize,
            _ => remaining.len(),
        };
        let page = &remaining[..limit.min(remaining.len())];

        let last_evaluated_key = if remaining.len() > page.len() {
            page.last().map(|item| extract_key(item, &key_attributes))
        } else {
            None
        };

        Ok(Some(QueryOutput {
            items: page
                .iter()
                .map(|item| project(item, &input.projection))
                .collect(),
            last_evaluated_key,
        }))
    }

    async fn get_item(&self, input: GetItemInput) -> BackendResult<GetItemOutput> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&input.table_name)
            .ok_or_else(|| BackendError::ResourceNotFound(input.table_name.clone()))?;

        let key = input.key.get(&table.partition_key).ok_or_else(|| BackendError::GetItem {
            table: input.table_name.clone(),
            key: crate::traits::describe_key(&input.key),
            message: format!("key must contain {}", table.partition_key),
        })?;

        let item = table
            .items
            .iter()
            .find(|item| table.primary_value(item) == Some(key))
            .map(|item| project(item, &input.projection));

        Ok(GetItemOutput { item })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KeyCondition;
    use pretty_assertions::assert_eq;

    fn task(id: &str, state: &str) -> Item {
        let mut item = Item::new();
        item.insert("TaskUUID".to_string(), AttributeValue::s(id));
        item.insert("State".to_string(), AttributeValue::s(state));
        item.insert("TaskName".to_string(), AttributeValue::s("resize"));
        item
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("task_states", "TaskUUID").await;
        store
            .create_index("task_states", "State-index", "State", None)
            .await
            .unwrap();
        for (id, state) in [("1", "FAILURE"), ("2", "SUCCESS"), ("3", "FAILURE"), ("4", "FAILURE")] {
            store.put_item("task_states", task(id, state)).await.unwrap();
        }
        store
    }

    fn ids(output: &QueryOutput) -> Vec<&str> {
        output
            .items
            .iter()
            .map(|i| i["TaskUUID"].as_s().unwrap())
            .collect()
    }

    fn failure_query() -> QueryInput {
        QueryInput::new("task_states", KeyCondition::eq("State", "FAILURE")).index("State-index")
    }

    #[tokio::test]
    async fn test_index_query_pages() {
        let store = seeded().await;

        let first = store.query(failure_query().limit(2)).await.unwrap().unwrap();
        assert_eq!(ids(&first), vec!["1", "3"]);
        let key = first.last_evaluated_key.clone().unwrap();
        assert_eq!(key.len(), 2);
        assert_eq!(key["TaskUUID"], AttributeValue::s("3"));

        let second = store
            .query(failure_query().limit(2).exclusive_start_key(Some(key)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&second), vec!["4"]);
        assert!(second.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_descending_query_with_projection() {
        let store = seeded().await;

        let output = store
            .query(failure_query().scan_forward(false).projection(["TaskUUID"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&output), vec!["4", "3", "1"]);
        assert!(output.items.iter().all(|i| i.len() == 1));
    }

    #[tokio::test]
    async fn test_unknown_index() {
        let store = seeded().await;
        let err = store
            .query(QueryInput::new("task_states", KeyCondition::eq("State", "FAILURE")).index("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_item_and_replace() {
        let store = seeded().await;
        store.put_item("task_states", task("3", "SUCCESS")).await.unwrap();
        assert_eq!(store.len("task_states").await, 4);

        let mut key = Item::new();
        key.insert("TaskUUID".to_string(), AttributeValue::s("3"));
        let found = store
            .get_item(GetItemInput::new("task_states", key.clone()).projection(["State"]))
            .await
            .unwrap();
        assert_eq!(found.item.unwrap()["State"], AttributeValue::s("SUCCESS"));

        key.insert("TaskUUID".to_string(), AttributeValue::s("99"));
        let missing = store.get_item(GetItemInput::new("task_states", key)).await.unwrap();
        assert!(missing.item.is_none());
    }
}
