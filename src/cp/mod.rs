//! CP-based scheduling formulation.
//!
//! [`ScheduleCpBuilder`] turns backlog tasks, machines and precedences into a
//! solver-agnostic [`CpModel`]; any [`CpSolver`] consumes it. The crate ships
//! [`BranchAndBoundSolver`], an exact solver for shop-floor sized backlogs.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

mod branch_bound;
mod builder;
mod model;
mod solver;

pub use branch_bound::BranchAndBoundSolver;
pub use builder::ScheduleCpBuilder;
pub use model::{
    CpAssignment, CpConstraint, CpModel, IntervalId, IntervalValue, IntervalVar, ModelError,
    Objective,
};
pub use solver::{CpSolution, CpSolver, SolveOutcome, SolveStats, SolverConfig};
