//! Production log endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::error::ServerError;
use super::schemas::{ApiJson, ProductionLogRequest};
use super::state::AppState;

/// Register production routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/production_log", post(log_production))
}

pub async fn log_production(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProductionLogRequest>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let cmd = req.validate()?;
    let log = state
        .engine
        .log_production(cmd.task_id, &cmd.resource_used, cmd.product_count)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Production log saved successfully for Task ID {}.", log.task_id),
            "log_id": log.log_id,
        })),
    ))
}
