//! Task endpoints and the schedule view.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::error::ServerError;
use super::schemas::{
    ApiJson, CreateTaskRequest, ScheduleEntry, StatusRequest, TaskCreated, TaskSummary,
    UpdateTaskRequest,
};
use super::state::AppState;
use crate::models::TaskId;

/// Register task routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .route("/tasks/{id}/status", patch(update_status))
        .route("/api/tasks", get(list_tasks))
        .route("/api/schedule", get(get_schedule))
}

// ── Views ────────────────────────────────────────────────────────────────────

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScheduleEntry>>, ServerError> {
    let rows = state.engine.schedule_view().await?;
    Ok(Json(rows.into_iter().map(ScheduleEntry::from).collect()))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TaskSummary>>, ServerError> {
    let tasks = state.engine.list_tasks().await?;
    Ok(Json(
        tasks
            .into_iter()
            .map(|t| TaskSummary {
                task_id: t.task_id,
                name: t.name,
            })
            .collect(),
    ))
}

// ── Mutations ────────────────────────────────────────────────────────────────

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskCreated>), ServerError> {
    let cmd = req.validate()?;
    let task = state
        .engine
        .create_task(&cmd.name, cmd.duration_hours, &cmd.machine_name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskCreated {
            message: format!(
                "Task '{}' added with ID {}. Run optimizer for true schedule.",
                task.name, task.task_id
            ),
            task_id: task.task_id,
            start_time: task.start_time,
            end_time: task.end_time,
        }),
    ))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Value>, ServerError> {
    state.engine.update_task(id, req.validate()?).await?;
    Ok(Json(json!({
        "message": format!(
            "Task {id} updated successfully. Status reset to Pending. Run optimizer now."
        )
    })))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<Value>, ServerError> {
    let status = state.engine.set_status(id, &req.validate()?).await?;
    Ok(Json(json!({
        "message": format!("Task {id} status updated to '{status}'. Run optimizer now.")
    })))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<Value>, ServerError> {
    state.engine.delete_task(id).await?;
    Ok(Json(json!({
        "message": format!(
            "Task {id} successfully deleted. Run optimizer to re-schedule remaining tasks."
        )
    })))
}
