//! Dashboard shared state

use std::sync::Arc;
use std::time::Instant;
use taskdash_backend::{DynamoDbStore, DynamoDbStoreConfig};
use taskdash_broker::{RedisBroker, RedisBrokerConfig};
use taskdash_core::DashConfig;
use tracing::info;

use crate::dashboard::{Dashboard, TaskDashboard, TaskTables};

/// Dashboard shared state
pub struct DashboardState {
    pub config: DashConfig,
    pub dashboard: Arc<dyn Dashboard>,
    pub started_at: Instant,
}

impl DashboardState {
    /// Connect to DynamoDB and Redis and build the dashboard
    pub async fn new(config: DashConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = DynamoDbStore::with_config(DynamoDbStoreConfig::from(&config.dynamodb)).await;

        if config.dynamodb.enable_ttl {
            for table in [
                &config.dynamodb.task_states_table,
                &config.dynamodb.group_metas_table,
            ] {
                store
                    .ensure_ttl(table, &config.dynamodb.ttl_attribute)
                    .await?;
            }
        }

        let broker = RedisBroker::with_config(RedisBrokerConfig::from(&config.broker)).await?;

        let dashboard = TaskDashboard::new(
            Arc::new(store),
            Arc::new(broker),
            TaskTables::from(&config.dynamodb),
        );

        info!(
            table = %config.dynamodb.task_states_table,
            index = %config.dynamodb.state_index,
            "Dashboard ready"
        );

        Ok(Self::with_dashboard(config, Arc::new(dashboard)))
    }

    /// Build state around an existing dashboard
    pub fn with_dashboard(config: DashConfig, dashboard: Arc<dyn Dashboard>) -> Self {
        Self {
            config,
            dashboard,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
