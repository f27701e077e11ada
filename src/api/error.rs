//! HTTP error type.
//!
//! Every handler returns `Result<T, ServerError>`. [`ServerError`] implements
//! [`IntoResponse`], producing `{"error": "<message>"}` with the status code
//! of the underlying [`EngineError`].
//!
//! Store and internal errors are logged with full detail; the caller only sees
//! a generic message so SQL and file paths never leak.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::engine::EngineError;

/// All errors a request can end with.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the scheduling engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The body was missing, not JSON, or failed request validation.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ServerError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Engine(e) => match e {
                EngineError::Validation(_)
                | EngineError::Infeasible { .. }
                | EngineError::Model(_) => StatusCode::BAD_REQUEST,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Conflict(_) => StatusCode::CONFLICT,
                EngineError::Busy => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Store(_) | EngineError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServerError::BadRequest(m) => json!({ "error": m }),
            ServerError::Engine(EngineError::Infeasible { message }) => {
                json!({ "error": message, "status": "INFEASIBLE" })
            }
            ServerError::Engine(e @ (EngineError::Store(_) | EngineError::Internal(_))) => {
                error!(error = %e, "request failed");
                json!({ "error": "internal server error" })
            }
            ServerError::Engine(e) => json!({ "error": e.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}
