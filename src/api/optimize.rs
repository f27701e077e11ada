//! Optimization endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::error::ServerError;
use super::schemas::{OptimizeRequest, OptimizeResponse};
use super::state::AppState;
use crate::engine::OptimizeReport;

/// Register optimization routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/optimize", post(optimize))
}

/// Re-plans every pending task.
///
/// The body is optional; an empty body anchors the schedule at the current
/// minute.
pub async fn optimize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ServerError> {
    let req = parse_body(&body)?;
    let report = state.engine.optimize(req.start_time.as_deref()).await?;
    let body = match report {
        OptimizeReport::NoBacklog => json!({
            "message": "Optimization successful. No pending tasks found to schedule."
        }),
        OptimizeReport::Scheduled(summary) => json!(OptimizeResponse {
            message: "Optimization successful. New schedule generated and saved.".into(),
            makespan_minutes: summary.makespan_minutes,
            status: summary.status.to_string(),
            scheduled_tasks: summary.scheduled_tasks,
        }),
    };
    Ok(Json(body))
}

fn parse_body(body: &[u8]) -> Result<OptimizeRequest, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(OptimizeRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_default() {
        assert!(parse_body(b"").unwrap().start_time.is_none());
        assert!(parse_body(b"  \n").unwrap().start_time.is_none());
        assert_eq!(
            parse_body(br#"{"start_time":"2025-03-03T08:00:00"}"#)
                .unwrap()
                .start_time
                .as_deref(),
            Some("2025-03-03T08:00:00")
        );
        assert!(parse_body(b"{not json").is_err());
    }
}
