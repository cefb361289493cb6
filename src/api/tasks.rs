//! Task CRUD endpoints.
//!
//! All handlers require an authenticated actor; the actor's email becomes
//! `created_by` on create and the note author on updates.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::task::{Task, TaskDraft, TaskFilter, TaskPatch};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{CreateTaskRequest, ListTasksQuery, UpdateTaskRequest};
use super::ApiError;

/// Task routes, nested under `/api/tasks`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/agents", get(list_agents))
        .route(
            "/:id",
            get(get_task).patch(update_task).delete(archive_task),
        )
}

/// GET /api/tasks - List tasks with optional filters.
///
/// Runs the auto-archive sweep before querying.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = TaskFilter::try_from(query)?;
    let tasks = state.service.list(&filter).await?;
    Ok(Json(tasks))
}

/// GET /api/tasks/agents - Distinct agent labels among non-archived tasks.
async fn list_agents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.service.agents().await?))
}

/// GET /api/tasks/:id - Get a specific task.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.service.get(id).await?))
}

/// POST /api/tasks - Create a task.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let draft = TaskDraft::try_from(req)?;
    let task = state.service.create(draft, &user.email).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/tasks/:id - Apply a partial update.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let patch = TaskPatch::try_from(req)?;
    let task = state.service.update(id, patch, &user.email).await?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id - Soft delete: the task is archived, never removed.
async fn archive_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state.service.archive(id, &user.email).await?;
    Ok(Json(task))
}
