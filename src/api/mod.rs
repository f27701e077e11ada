//! HTTP/JSON surface.
//!
//! [`build`] assembles the complete router:
//! - health check
//! - machine, task and precedence CRUD
//! - the schedule view and the optimizer trigger
//! - production logging
//!
//! Every request is traced with `tower-http`'s [`TraceLayer`].

pub mod error;
mod health;
mod machines;
mod optimize;
mod precedences;
mod production;
pub mod schemas;
mod state;
mod tasks;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ServerError;
pub use state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(machines::router())
        .merge(tasks::router())
        .merge(precedences::router())
        .merge(optimize::router())
        .merge(production::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
