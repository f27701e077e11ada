//! The scheduling engine.
//!
//! [`SchedulingEngine`] owns a [`ShopStore`], an optimization capability and
//! the backlog guard. It exposes every operation the HTTP layer needs:
//!
//! - CRUD for machines, tasks and precedence edges;
//! - task creation with a provisional sequential placement
//!   ([`estimator`]);
//! - full re-optimization: [`assembler`] → [`crate::cp::ScheduleCpBuilder`] →
//!   [`optimizer`] → [`materializer`].
//!
//! # Concurrency
//! Optimization is single-flight. [`SchedulingEngine::optimize`] tries the
//! guard and fails with [`EngineError::Busy`] if a run holds it; every backlog
//! mutation waits for it instead.

pub mod assembler;
mod error;
pub mod estimator;
pub mod materializer;
pub mod optimizer;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::EngineConfig;
use crate::cp::{BranchAndBoundSolver, CpSolver, ScheduleCpBuilder, SolveStats};
use crate::models::{
    Machine, MachineId, PrecedenceEdge, ProductionLog, Task, TaskId, TaskStatus,
    MAX_DURATION_HOURS,
};
use crate::store::{MachineDeletion, NewTask, ScheduleRow, ShopStore, TaskPatch};
use crate::validation::diagnose_infeasibility;

pub use error::{EngineError, Result};

/// Fields of a task to edit, as named by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub duration_hours: Option<f64>,
    pub machine_name: Option<String>,
}

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeReport {
    /// Nothing was waiting; no rows changed.
    NoBacklog,
    /// A schedule was found and persisted.
    Scheduled(OptimizeSummary),
}

/// Details of a persisted schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeSummary {
    /// `"OPTIMAL"` or `"FEASIBLE"`.
    pub status: &'static str,
    /// Latest backlog end, in minutes from the anchor.
    pub makespan_minutes: i64,
    /// Tasks written as Scheduled.
    pub scheduled_tasks: usize,
    /// Instant that offset 0 maps to.
    pub anchor: DateTime<Utc>,
    pub stats: SolveStats,
}

/// Shop-floor scheduling engine over a store `S`.
pub struct SchedulingEngine<S> {
    store: S,
    solver: Arc<dyn CpSolver>,
    config: EngineConfig,
    guard: Mutex<()>,
}

impl<S: ShopStore> SchedulingEngine<S> {
    /// Creates an engine using the built-in branch-and-bound solver.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_solver(store, config, Arc::new(BranchAndBoundSolver::new()))
    }

    /// Creates an engine with a custom optimization capability.
    pub fn with_solver(store: S, config: EngineConfig, solver: Arc<dyn CpSolver>) -> Self {
        Self {
            store,
            solver,
            config,
            guard: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── machines ─────────────────────────────────────────────────────────────

    pub async fn list_machines(&self) -> Result<Vec<Machine>> {
        Ok(self.store.list_machines().await?)
    }

    /// Adds a machine. Names are unique.
    pub async fn add_machine(&self, name: &str, capacity: i64) -> Result<MachineId> {
        let name = required_text(name, "Missing required field: name")?;
        if capacity < 1 {
            return Err(EngineError::Validation(format!(
                "capacity must be a positive integer, got {capacity}"
            )));
        }

        let _guard = self.guard.lock().await;
        match self.store.insert_machine(name, capacity).await {
            Ok(id) => Ok(id),
            Err(e) if e.is_unique_violation() => Err(EngineError::Conflict(format!(
                "Machine '{name}' already exists."
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a machine no task requires.
    pub async fn delete_machine(&self, machine_id: MachineId) -> Result<()> {
        let _guard = self.guard.lock().await;
        match self.store.delete_machine(machine_id).await? {
            MachineDeletion::Deleted => Ok(()),
            MachineDeletion::NotFound => Err(EngineError::NotFound(format!(
                "Machine with ID {machine_id} not found."
            ))),
            MachineDeletion::Referenced(count) => Err(EngineError::Conflict(format!(
                "Cannot delete machine ID {machine_id}. It is currently required by {count} task(s)."
            ))),
        }
    }

    // ── tasks ────────────────────────────────────────────────────────────────

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.store.list_tasks().await?)
    }

    /// Every task with its machine name, for the schedule view.
    pub async fn schedule_view(&self) -> Result<Vec<ScheduleRow>> {
        Ok(self.store.list_schedule().await?)
    }

    /// Creates a Pending task placed right after the latest work on its
    /// machine. The placement is provisional until the next optimization.
    pub async fn create_task(
        &self,
        name: &str,
        duration_hours: f64,
        machine_name: &str,
    ) -> Result<Task> {
        let name = required_text(name, "Missing required field: name")?;
        let machine_name = required_text(machine_name, "Missing required field: machine_name")?;
        check_duration(duration_hours)?;

        let _guard = self.guard.lock().await;
        let machine = self.machine_by_name(machine_name).await?;
        let now = Utc::now();
        let task = self
            .store
            .insert_task(
                NewTask {
                    name: name.to_string(),
                    duration_hours,
                    machine_id: machine.machine_id,
                },
                move |latest_end| estimator::estimate_placement(latest_end, now, duration_hours),
            )
            .await?;
        info!(
            task_id = task.task_id,
            machine = %machine.name,
            "task created with provisional placement"
        );
        Ok(task)
    }

    /// Edits a task and returns it to the backlog.
    pub async fn update_task(&self, task_id: TaskId, update: TaskUpdate) -> Result<()> {
        if update.name.is_none() && update.duration_hours.is_none() && update.machine_name.is_none()
        {
            return Err(EngineError::Validation(
                "No valid fields provided for update (name, duration_hours, machine_name).".into(),
            ));
        }
        let name = update
            .name
            .as_deref()
            .map(|n| required_text(n, "name must not be empty").map(str::to_string))
            .transpose()?;
        if let Some(hours) = update.duration_hours {
            check_duration(hours)?;
        }

        let _guard = self.guard.lock().await;
        let machine_id = match update.machine_name.as_deref() {
            Some(machine_name) => Some(self.machine_by_name(machine_name.trim()).await?.machine_id),
            None => None,
        };
        let patch = TaskPatch {
            name,
            duration_hours: update.duration_hours,
            machine_id,
        };
        if !self.store.update_task(task_id, patch).await? {
            return Err(task_not_found(task_id));
        }
        Ok(())
    }

    /// Sets a task's status.
    ///
    /// Pending clears the times. Scheduled and Completed require the task to
    /// carry both times already.
    pub async fn set_status(&self, task_id: TaskId, status: &str) -> Result<TaskStatus> {
        let status: TaskStatus = status
            .parse()
            .map_err(|e: crate::models::UnknownStatus| EngineError::Validation(e.to_string()))?;

        let _guard = self.guard.lock().await;
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| task_not_found(task_id))?;
        if status.requires_times() && task.span().is_none() {
            return Err(EngineError::Validation(format!(
                "Task {task_id} has no start/end times; run the optimizer before marking it {status}."
            )));
        }

        let clear_times = status == TaskStatus::Pending;
        if !self.store.set_task_status(task_id, status, clear_times).await? {
            return Err(task_not_found(task_id));
        }
        Ok(status)
    }

    /// Deletes a task with its edges and production logs.
    pub async fn delete_task(&self, task_id: TaskId) -> Result<()> {
        let _guard = self.guard.lock().await;
        if !self.store.delete_task(task_id).await? {
            return Err(task_not_found(task_id));
        }
        Ok(())
    }

    // ── precedences ──────────────────────────────────────────────────────────

    pub async fn list_precedences(&self) -> Result<Vec<PrecedenceEdge>> {
        Ok(self.store.list_precedences().await?)
    }

    /// Records that `edge.predecessor_task_id` must finish first.
    ///
    /// Returns `false` if the edge already existed. Cycles are not rejected
    /// here; they surface as an infeasible optimization.
    pub async fn add_precedence(&self, edge: PrecedenceEdge) -> Result<bool> {
        if edge.is_self_loop() {
            return Err(EngineError::Validation(format!(
                "Task {} cannot precede itself.",
                edge.predecessor_task_id
            )));
        }

        let _guard = self.guard.lock().await;
        for task_id in [edge.predecessor_task_id, edge.successor_task_id] {
            if self.store.get_task(task_id).await?.is_none() {
                return Err(task_not_found(task_id));
            }
        }
        Ok(self.store.insert_precedence(edge).await?)
    }

    pub async fn remove_precedence(&self, edge: PrecedenceEdge) -> Result<()> {
        let _guard = self.guard.lock().await;
        if !self.store.delete_precedence(edge).await? {
            return Err(EngineError::NotFound(format!(
                "Precedence rule {} -> {} not found.",
                edge.predecessor_task_id, edge.successor_task_id
            )));
        }
        Ok(())
    }

    // ── production ───────────────────────────────────────────────────────────

    /// Records actual output for a task.
    pub async fn log_production(
        &self,
        task_id: TaskId,
        resource_used: &str,
        product_count: i64,
    ) -> Result<ProductionLog> {
        if product_count < 0 {
            return Err(EngineError::Validation(
                "product_count must be a non-negative integer".into(),
            ));
        }
        if self.store.get_task(task_id).await?.is_none() {
            return Err(task_not_found(task_id));
        }
        Ok(self
            .store
            .insert_production_log(task_id, resource_used, product_count)
            .await?)
    }

    // ── optimization ─────────────────────────────────────────────────────────

    /// Re-plans the whole backlog and persists the result.
    ///
    /// `start_time` is the anchor (see [`materializer::parse_anchor`]); `None`
    /// uses the current instant. On failure nothing is written.
    pub async fn optimize(&self, start_time: Option<&str>) -> Result<OptimizeReport> {
        let anchor = materializer::resolve_anchor(start_time, Utc::now())?;
        let _guard = self.guard.try_lock().map_err(|_| EngineError::Busy)?;

        let problem =
            assembler::load(&self.store, anchor, self.config.respect_committed).await?;
        if problem.is_empty() {
            info!(%anchor, "no pending tasks to schedule");
            return Ok(OptimizeReport::NoBacklog);
        }

        let horizon = self.config.horizon_minutes;
        let builder = ScheduleCpBuilder::new(&problem.backlog, &problem.machines)
            .with_precedences(problem.edges.clone())
            .with_committed(problem.committed.clone());
        let model = builder.build(horizon);
        info!(
            tasks = problem.backlog.len(),
            committed = problem.committed.len(),
            edges = problem.edges.len(),
            horizon,
            %anchor,
            "solving backlog"
        );

        let (model, solution) = optimizer::solve_blocking(
            Arc::clone(&self.solver),
            model,
            self.config.solver_config(),
        )
        .await?;
        optimizer::accept(&model, &solution, || {
            diagnose_infeasibility(&problem.backlog, &problem.edges, horizon)
        })?;

        let schedule = builder.decode_solution(&solution);
        let scheduled_tasks = materializer::materialize(&self.store, anchor, &schedule).await?;
        let summary = OptimizeSummary {
            status: solution.outcome.status_label(),
            makespan_minutes: schedule.makespan(),
            scheduled_tasks,
            anchor,
            stats: solution.stats,
        };
        info!(
            status = summary.status,
            makespan = summary.makespan_minutes,
            scheduled = summary.scheduled_tasks,
            nodes = summary.stats.nodes,
            elapsed_ms = summary.stats.elapsed.as_millis() as u64,
            "schedule saved"
        );
        Ok(OptimizeReport::Scheduled(summary))
    }

    // ── private helpers ──────────────────────────────────────────────────────

    async fn machine_by_name(&self, name: &str) -> Result<Machine> {
        self.store
            .find_machine_by_name(name)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Machine not found: {name}")))
    }
}

fn required_text<'a>(value: &'a str, missing: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::Validation(missing.to_string()));
    }
    Ok(value)
}

fn check_duration(hours: f64) -> Result<()> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(EngineError::Validation(format!(
            "duration_hours must be a positive number, got {hours}"
        )));
    }
    if hours > MAX_DURATION_HOURS {
        return Err(EngineError::Validation(format!(
            "duration_hours must not exceed {MAX_DURATION_HOURS}, got {hours}"
        )));
    }
    Ok(())
}

fn task_not_found(task_id: TaskId) -> EngineError {
    EngineError::NotFound(format!("Task with ID {task_id} not found."))
}
