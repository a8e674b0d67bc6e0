/// Task endpoints
///
/// Owners only ever see their own live tasks. Creating a task costs one
/// credit; reads, updates and deletes are free.
///
/// - `GET /api/tasks`
/// - `POST /api/tasks`
/// - `GET /api/tasks/:id`
/// - `PUT /api/tasks/:id`
/// - `DELETE /api/tasks/:id`

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use taskledger_shared::{
    auth::middleware::AuthContext,
    models::task::{Task, TaskScope},
    tasks::TaskInput,
};
use uuid::Uuid;
use validator::Validate;

/// Task body for create and update
///
/// Update is a full overwrite: omitted fields are reset to their defaults.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title is required (at most 255 characters)"))]
    pub title: String,

    pub description: Option<String>,

    /// `pending`, `in-progress` or `completed`
    pub status: Option<String>,

    /// `low`, `medium` or `high`
    pub priority: Option<String>,

    /// `YYYY-MM-DD` or RFC 3339
    pub due_date: Option<String>,

    #[validate(length(max = 255, message = "Assignee must be at most 255 characters"))]
    pub assignee: Option<String>,
}

impl From<TaskRequest> for TaskInput {
    fn from(req: TaskRequest) -> Self {
        TaskInput {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            assignee: req.assignee,
        }
    }
}

pub async fn list_tasks(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.tasks.list_tasks(TaskScope::Owner(auth.account_id)).await?;
    Ok(Json(tasks))
}

/// Creates a task and charges one credit
///
/// # Errors
///
/// - `400 Bad Request`: Bad date, status or priority
/// - `403 Forbidden`: Insufficient credits
/// - `422 Unprocessable Entity`: Missing or oversized title
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state.tasks.create_task(auth.account_id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.tasks.get_task(TaskScope::Owner(auth.account_id), id).await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = state
        .tasks
        .update_task(TaskScope::Owner(auth.account_id), id, req.into())
        .await?;
    Ok(Json(task))
}

/// Soft-deletes a task
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .tasks
        .delete_task(TaskScope::Owner(auth.account_id), id)
        .await?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}
