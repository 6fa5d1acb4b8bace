//! Dashboard API router and server

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use taskdash_core::DashConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::DashboardState;

/// Dashboard API server
pub struct DashboardApi {
    state: Arc<DashboardState>,
}

impl DashboardApi {
    /// Create new dashboard API
    pub async fn new(config: DashConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let state = DashboardState::new(config).await?;
        Ok(Self::from_state(state))
    }

    /// Wrap already-built state
    pub fn from_state(state: DashboardState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the API router
    pub fn router(&self) -> Router {
        let state = self.state.clone();

        let cors = if self.state.config.server.enable_cors {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            CorsLayer::new()
        };

        Router::new()
            .route("/ping", get(handlers::ping))
            .route("/api/health", get(handlers::health_check))
            // Tasks
            .route("/api/tasks", get(handlers::list_tasks))
            .route("/api/tasks/:id", get(handlers::get_task))
            .route("/api/tasks/:id/rerun", post(handlers::rerun_task))
            .route("/api/rerun", post(handlers::rerun_signature))
            .with_state(state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the dashboard server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr: SocketAddr = self.state.config.server.addr().parse()?;

        let router = self.router();

        tracing::info!("Starting taskdash on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// API endpoints summary for documentation
pub fn api_endpoints() -> Vec<ApiEndpoint> {
    vec![
        ApiEndpoint {
            method: "GET",
            path: "/ping",
            description: "Liveness check",
        },
        ApiEndpoint {
            method: "GET",
            path: "/api/health",
            description: "Health check endpoint",
        },
        ApiEndpoint {
            method: "GET",
            path: "/api/tasks",
            description: "List tasks by state (state, next, prev, size)",
        },
        ApiEndpoint {
            method: "GET",
            path: "/api/tasks/:id",
            description: "Get a task record",
        },
        ApiEndpoint {
            method: "POST",
            path: "/api/tasks/:id/rerun",
            description: "Re-submit a task's stored signature",
        },
        ApiEndpoint {
            method: "POST",
            path: "/api/rerun",
            description: "Re-submit a JSON signature",
        },
    ]
}

/// API endpoint documentation
pub struct ApiEndpoint {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{TaskDashboard, TaskTables};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use taskdash_backend::MemoryStore;
    use taskdash_broker::{AsyncResult, BrokerResult, TaskSubmitter};
    use taskdash_core::{Signature, TaskRecord, TaskState};
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingSubmitter {
        sent: Mutex<Vec<Signature>>,
    }

    #[async_trait]
    impl TaskSubmitter for RecordingSubmitter {
        async fn send_task(&self, signature: Signature) -> BrokerResult<AsyncResult> {
            self.sent.lock().unwrap().push(signature.clone());
            Ok(AsyncResult::new(signature))
        }
    }

    async fn api() -> (DashboardApi, Arc<RecordingSubmitter>) {
        let store = MemoryStore::new();
        store.create_table("task_states", "TaskUUID").await;
        store
            .create_index("task_states", "State-index", "State", None)
            .await
            .unwrap();

        for (id, state) in [
            ("1", TaskState::Failure),
            ("2", TaskState::Success),
            ("3", TaskState::Failure),
        ] {
            let signature = Signature {
                uuid: id.to_string(),
                ..Signature::new("resize").routing_key("images")
            };
            let record = TaskRecord {
                task_id: id.to_string(),
                state,
                task_name: "resize".to_string(),
                signature: signature.to_json().unwrap(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
                error: String::new(),
            };
            store.put_item("task_states", record.to_item()).await.unwrap();
        }

        let submitter = Arc::new(RecordingSubmitter::default());
        let dashboard = TaskDashboard::new(
            Arc::new(store),
            submitter.clone(),
            TaskTables::default(),
        );
        let state = DashboardState::with_dashboard(DashConfig::default(), Arc::new(dashboard));
        (DashboardApi::from_state(state), submitter)
    }

    async fn call(api: &DashboardApi, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = api.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_listen_address_parses() {
        let mut config = DashConfig::default();
        let addr: SocketAddr = config.server.addr().parse().unwrap();
        assert_eq!(addr.port(), config.server.port);

        config.server.host = "::1".to_string();
        let addr: SocketAddr = config.server.addr().parse().unwrap();
        assert!(addr.is_ipv6());
    }

    #[tokio::test]
    async fn test_ping() {
        let (api, _) = api().await;
        let response = api.router().oneshot(get("/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"pong");
    }

    #[tokio::test]
    async fn test_list_defaults_to_failure() {
        let (api, _) = api().await;
        let (status, body) = call(&api, get("/api/tasks?size=1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["current_state"], "FAILURE");
        assert_eq!(body["data"]["enable_rerun"], true);
        assert_eq!(body["data"]["states"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"]["tasks"][0]["task_id"], "1");

        let cursor = body["data"]["cursor"].as_str().unwrap().to_string();
        assert!(!cursor.is_empty());

        let (_, body) = call(&api, get(&format!("/api/tasks?size=1&next={}", cursor))).await;
        assert_eq!(body["data"]["tasks"][0]["task_id"], "3");
        assert_eq!(body["data"]["cursor"], "");
    }

    #[tokio::test]
    async fn test_prev_cursor_keeps_oldest_first() {
        let (api, _) = api().await;
        let (_, body) = call(&api, get("/api/tasks?size=1")).await;
        let cursor = body["data"]["cursor"].as_str().unwrap().to_string();

        let (status, body) = call(&api, get(&format!("/api/tasks?size=1&prev={}", cursor))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tasks"][0]["task_id"], "3");
        assert_eq!(body["data"]["cursor"], "");

        let uri = format!("/api/tasks?size=1&next=not-base64!!&prev={}", cursor);
        let (status, body) = call(&api, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tasks"][0]["task_id"], "3");
    }

    #[tokio::test]
    async fn test_list_lowercase_state() {
        let (api, _) = api().await;
        let (status, body) = call(&api, get("/api/tasks?state=success")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["enable_rerun"], false);
        assert_eq!(body["data"]["tasks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_input() {
        let (api, _) = api().await;

        let (status, body) = call(&api, get("/api/tasks?state=lost")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(&api, get("/api/tasks?next=not-base64!!")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_task() {
        let (api, _) = api().await;

        let (status, body) = call(&api, get("/api/tasks/2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "SUCCESS");

        let (status, body) = call(&api, get("/api/tasks/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("42"));
    }

    #[tokio::test]
    async fn test_rerun_by_id() {
        let (api, submitter) = api().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/tasks/3/rerun")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&api, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["task_uuid"], "3");
        assert_eq!(body["data"]["routing_key"], "images");
        assert_eq!(submitter.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_by_signature() {
        let (api, submitter) = api().await;

        let signature = Signature {
            uuid: "task_7".to_string(),
            ..Signature::new("resize")
        };
        let (status, body) = call(
            &api,
            post_json(
                "/api/rerun",
                serde_json::json!({ "signature": signature.to_json().unwrap() }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["task_uuid"], "task_7");

        let (status, _) = call(
            &api,
            post_json("/api/rerun", serde_json::json!({ "signature": "{oops" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(submitter.sent.lock().unwrap().len(), 1);
    }
}
