//! Shared application state injected into every handler.

use crate::engine::SchedulingEngine;
use crate::store::SqliteStore;

/// State shared across all HTTP handlers.
pub struct AppState {
    pub engine: SchedulingEngine<SqliteStore>,
}

impl AppState {
    pub fn new(engine: SchedulingEngine<SqliteStore>) -> Self {
        Self { engine }
    }
}
