//! The optimization capability boundary.
//!
//! [`CpSolver`] is the contract the scheduling engine consumes: given a
//! [`CpModel`], return exactly one [`SolveOutcome`]. The engine treats
//! `Optimal` and `Feasible` alike; `Infeasible` and `ModelError` are failures.

use std::time::Duration;

use super::model::{CpAssignment, CpModel, ModelError};

/// Solver limits and search parameters.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock bound. `None` searches until optimality is proven.
    pub time_limit: Option<Duration>,
    /// Seed for randomized restarts.
    pub seed: u64,
    /// Number of randomized restarts used to find a first incumbent.
    pub restarts: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(10)),
            seed: 42,
            restarts: 32,
        }
    }
}

impl SolverConfig {
    /// Sets the wall-clock bound.
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of randomized restarts.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }
}

/// What a solve produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Proven minimal objective.
    Optimal {
        assignment: CpAssignment,
        objective: i64,
    },
    /// Valid assignment; optimality not proven before a limit was hit.
    Feasible {
        assignment: CpAssignment,
        objective: i64,
    },
    /// No assignment satisfies every constraint.
    Infeasible,
    /// The model itself is malformed.
    ModelError(ModelError),
}

impl SolveOutcome {
    /// Upper-case label reported to callers.
    pub fn status_label(&self) -> &'static str {
        match self {
            SolveOutcome::Optimal { .. } => "OPTIMAL",
            SolveOutcome::Feasible { .. } => "FEASIBLE",
            SolveOutcome::Infeasible => "INFEASIBLE",
            SolveOutcome::ModelError(_) => "MODEL_INVALID",
        }
    }

    /// Whether a usable assignment was produced.
    pub fn is_solution_found(&self) -> bool {
        self.assignment().is_some()
    }

    /// The assignment, for `Optimal` and `Feasible`.
    pub fn assignment(&self) -> Option<&CpAssignment> {
        match self {
            SolveOutcome::Optimal { assignment, .. } | SolveOutcome::Feasible { assignment, .. } => {
                Some(assignment)
            }
            _ => None,
        }
    }

    /// The objective value, for `Optimal` and `Feasible`.
    pub fn objective(&self) -> Option<i64> {
        match self {
            SolveOutcome::Optimal { objective, .. } | SolveOutcome::Feasible { objective, .. } => {
                Some(*objective)
            }
            _ => None,
        }
    }
}

/// Search statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Search nodes expanded.
    pub nodes: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Whether the time limit stopped the search.
    pub hit_time_limit: bool,
}

/// Result of one solve.
#[derive(Debug, Clone)]
pub struct CpSolution {
    pub outcome: SolveOutcome,
    pub stats: SolveStats,
}

impl CpSolution {
    pub fn new(outcome: SolveOutcome, stats: SolveStats) -> Self {
        Self { outcome, stats }
    }

    pub fn is_solution_found(&self) -> bool {
        self.outcome.is_solution_found()
    }
}

/// An optimization capability.
///
/// Implementations must never return an assignment that violates a model
/// constraint. They may be exact or approximate; an approximate solver
/// reports `Feasible`.
pub trait CpSolver: Send + Sync {
    /// Solves the model within the given limits.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}
