//! Optimization adapter: runs a [`CpSolver`] off the async runtime and turns
//! its outcome into engine results.

use std::sync::Arc;

use tracing::{error, info};

use super::error::{EngineError, Result};
use crate::cp::{CpModel, CpSolution, CpSolver, SolveOutcome, SolverConfig};

/// Message prefix for infeasible backlogs.
const INFEASIBLE: &str = "Optimization failed. No feasible schedule found. Check your tasks and machines";

/// Solves `model` on the blocking thread pool. The model is handed back for
/// verification.
pub async fn solve_blocking(
    solver: Arc<dyn CpSolver>,
    model: CpModel,
    config: SolverConfig,
) -> Result<(CpModel, CpSolution)> {
    tokio::task::spawn_blocking(move || {
        let solution = solver.solve(&model, &config);
        (model, solution)
    })
    .await
    .map_err(|e| EngineError::Internal(format!("solver task failed: {e}")))
}

/// Accepts `Optimal` and `Feasible` outcomes whose assignment satisfies the
/// model; everything else becomes an error.
///
/// `diagnose` is only called for infeasible outcomes, to explain them.
pub fn accept(
    model: &CpModel,
    solution: &CpSolution,
    diagnose: impl FnOnce() -> Option<String>,
) -> Result<()> {
    match &solution.outcome {
        SolveOutcome::ModelError(e) => Err(EngineError::Model(e.clone())),
        SolveOutcome::Infeasible => {
            let message = match diagnose() {
                Some(cause) => format!("{INFEASIBLE}: {cause}."),
                None => format!("{INFEASIBLE}."),
            };
            info!(
                nodes = solution.stats.nodes,
                timed_out = solution.stats.hit_time_limit,
                "backlog is infeasible"
            );
            Err(EngineError::Infeasible { message })
        }
        SolveOutcome::Optimal { assignment, .. } | SolveOutcome::Feasible { assignment, .. } => {
            let violations = model.verify(assignment);
            if let Some(first) = violations.first() {
                error!(
                    count = violations.len(),
                    first = %first.message,
                    "solver returned an assignment that violates the model"
                );
                return Err(EngineError::Internal(format!(
                    "solver output failed verification: {}",
                    first.message
                )));
            }
            Ok(())
        }
    }
}
