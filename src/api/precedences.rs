//! Precedence rule endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::error::ServerError;
use super::schemas::{ApiJson, PrecedenceRequest};
use super::state::AppState;
use crate::models::PrecedenceEdge;

/// Register precedence routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/precedences",
        get(list_precedences)
            .post(create_precedence)
            .delete(delete_precedence),
    )
}

pub async fn list_precedences(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PrecedenceEdge>>, ServerError> {
    Ok(Json(state.engine.list_precedences().await?))
}

/// Adding an existing rule again is accepted and changes nothing.
pub async fn create_precedence(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PrecedenceRequest>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let edge = req.validate()?;
    state.engine.add_precedence(edge).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "Precedence rule added: Task {} follows Task {}.",
                edge.successor_task_id, edge.predecessor_task_id
            )
        })),
    ))
}

pub async fn delete_precedence(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PrecedenceRequest>,
) -> Result<Json<Value>, ServerError> {
    let edge = req.validate()?;
    state.engine.remove_precedence(edge).await?;
    Ok(Json(json!({
        "message": format!(
            "Precedence rule removed: Task {} no longer follows Task {}.",
            edge.successor_task_id, edge.predecessor_task_id
        )
    })))
}
