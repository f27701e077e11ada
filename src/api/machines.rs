//! Machine endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::error::ServerError;
use super::schemas::{ApiJson, CreateMachineRequest, MachineCreated};
use super::state::AppState;
use crate::models::{Machine, MachineId};

/// Register machine routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/machines", get(list_machines).post(create_machine))
        .route("/api/machines/{id}", delete(delete_machine))
}

pub async fn list_machines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Machine>>, ServerError> {
    Ok(Json(state.engine.list_machines().await?))
}

pub async fn create_machine(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateMachineRequest>,
) -> Result<(StatusCode, Json<MachineCreated>), ServerError> {
    let (name, capacity) = req.validate()?;
    let machine_id = state.engine.add_machine(&name, capacity).await?;
    Ok((
        StatusCode::CREATED,
        Json(MachineCreated {
            message: format!("Machine '{}' added with ID {machine_id}.", name.trim()),
            machine_id,
        }),
    ))
}

pub async fn delete_machine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MachineId>,
) -> Result<Json<Value>, ServerError> {
    state.engine.delete_machine(id).await?;
    Ok(Json(json!({ "message": format!("Machine ID {id} successfully deleted.") })))
}
