//! HTTP request handlers for dashboard API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskdash_core::{Signature, TaskRecord, TaskState};

use crate::state::DashboardState;
use crate::DashboardError;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Error returned from a handler, rendered as an error envelope
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DashboardError::Decode(_) | DashboardError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Deserialize { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::Store { .. } | DashboardError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DashboardError::Dispatch { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query parameters for task listing
#[derive(Deserialize, Default)]
pub struct TaskQuery {
    pub state: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
    pub size: Option<String>,
}

impl TaskQuery {
    /// Requested state, upper-cased, FAILURE when absent
    pub fn state(&self) -> Result<TaskState, DashboardError> {
        match self.state.as_deref().map(str::trim) {
            None | Some("") => Ok(TaskState::default()),
            Some(raw) => raw
                .to_uppercase()
                .parse::<TaskState>()
                .map_err(|e| DashboardError::BadRequest(e.to_string())),
        }
    }

    /// Cursor and direction. `prev` wins over `next`; listing is always
    /// oldest first, so `prev` is a cursor the client saved for an earlier page.
    pub fn cursor(&self) -> (Option<&str>, bool) {
        match self.prev.as_deref().filter(|c| !c.is_empty()) {
            Some(prev) => (Some(prev), true),
            None => (self.next.as_deref(), true),
        }
    }

    /// Page size; anything unparseable falls back to the default
    pub fn size(&self) -> i64 {
        self.size
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// One page of the task listing
#[derive(Serialize)]
pub struct TaskListResponse {
    pub current_state: TaskState,
    pub states: Vec<TaskState>,
    pub enable_rerun: bool,
    pub tasks: Vec<TaskRecord>,
    /// Empty when there is no further page
    pub cursor: String,
}

/// Request body for rerunning a raw signature
#[derive(Deserialize)]
pub struct RerunRequest {
    pub signature: String,
}

/// Rerun result
#[derive(Serialize)]
pub struct RerunResponse {
    pub task_uuid: String,
    pub routing_key: String,
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /api/health
pub async fn health_check(
    State(state): State<Arc<DashboardState>>,
) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    }))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<TaskListResponse> {
    let task_state = query.state()?;
    let (cursor, ascending) = query.cursor();

    let page = state
        .dashboard
        .find_all_tasks_by_state(task_state, cursor, ascending, query.size())
        .await?;

    Ok(Json(ApiResponse::success(TaskListResponse {
        current_state: task_state,
        states: TaskState::ALL.to_vec(),
        enable_rerun: task_state == TaskState::Failure,
        tasks: page.tasks,
        cursor: page.next_cursor.unwrap_or_default(),
    })))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<Arc<DashboardState>>,
    Path(task_id): Path<String>,
) -> ApiResult<TaskRecord> {
    let task = state.dashboard.find_task_by_id(&task_id).await?;
    Ok(Json(ApiResponse::success(task)))
}

/// POST /api/tasks/:id/rerun
pub async fn rerun_task(
    State(state): State<Arc<DashboardState>>,
    Path(task_id): Path<String>,
) -> ApiResult<RerunResponse> {
    let result = state.dashboard.rerun_task(&task_id).await?;

    Ok(Json(ApiResponse::success(RerunResponse {
        task_uuid: result.task_uuid().to_string(),
        routing_key: result.signature.routing_key,
    })))
}

/// POST /api/rerun
pub async fn rerun_signature(
    State(state): State<Arc<DashboardState>>,
    Json(request): Json<RerunRequest>,
) -> ApiResult<RerunResponse> {
    let signature = Signature::from_json(&request.signature)
        .map_err(|e| DashboardError::BadRequest(format!("invalid signature: {}", e)))?;

    let result = state.dashboard.rerun_signature(signature).await?;

    Ok(Json(ApiResponse::success(RerunResponse {
        task_uuid: result.task_uuid().to_string(),
        routing_key: result.signature.routing_key,
    })))
}
