//! Liveness endpoint.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};

use super::state::AppState;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Returns `"ok"` with HTTP 200 while the process is serving requests.
pub async fn get_health() -> Json<&'static str> {
    Json("ok")
}
