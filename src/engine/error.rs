//! Engine error taxonomy.

use thiserror::Error;

use crate::cp::ModelError;
use crate::store::StoreError;

/// Everything an engine operation can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Unknown task, machine or edge.
    #[error("{0}")]
    NotFound(String),

    /// The operation would break a reference or a uniqueness rule.
    #[error("{0}")]
    Conflict(String),

    /// No schedule satisfies every constraint.
    #[error("{message}")]
    Infeasible { message: String },

    /// The optimization capability rejected the model.
    #[error("invalid scheduling model: {0}")]
    Model(#[from] ModelError),

    /// Another optimization run holds the backlog.
    #[error("an optimization run is already in progress; retry shortly")]
    Busy,

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Anything else (worker join failures, inconsistent solver output).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingRow { table, id } => {
                EngineError::NotFound(format!("{table} row {id} not found"))
            }
            other => EngineError::Store(other),
        }
    }
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, EngineError>;
