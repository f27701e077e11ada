//! Persistence layer.
//!
//! [`ShopStore`] is everything the engine needs from a database. The default
//! implementation is [`sqlite::SqliteStore`]. Every method that writes more
//! than one row runs in a single transaction.
//!
//! Trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75), so no `async-trait` crate is required.

pub mod sqlite;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Machine, MachineId, PrecedenceEdge, ProductionLog, Task, TaskId, TaskStatus,
};

pub use sqlite::SqliteStore;

/// Errors raised by a [`ShopStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Propagated from the database driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row expected by a multi-row write was not there; the write was
    /// rolled back.
    #[error("{table} row {id} not found")]
    MissingRow { table: &'static str, id: i64 },
}

impl StoreError {
    /// Whether the error is a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Database(e) => e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()),
            StoreError::MissingRow { .. } => false,
        }
    }
}

/// Store result alias.
pub type StoreResult<T> = Result<T, StoreError>;

/// A task to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub duration_hours: f64,
    pub machine_id: MachineId,
}

/// Fields of a task to overwrite. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub duration_hours: Option<f64>,
    pub machine_id: Option<MachineId>,
}

impl TaskPatch {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.duration_hours.is_none() && self.machine_id.is_none()
    }
}

/// Solver-derived times for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub task_id: TaskId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One row of the schedule listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub task: Task,
    pub machine_name: String,
}

/// Outcome of a machine deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineDeletion {
    Deleted,
    NotFound,
    /// Still required by this many tasks; nothing was deleted.
    Referenced(i64),
}

/// Everything the scheduling engine persists.
///
/// Implement this trait to swap SQLite for another database without touching
/// the engine.
pub trait ShopStore: Send + Sync + 'static {
    // ── machines ─────────────────────────────────────────────────────────────

    /// All machines, ordered by id.
    fn list_machines(&self) -> impl Future<Output = StoreResult<Vec<Machine>>> + Send;

    /// Looks a machine up by its unique name.
    fn find_machine_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<Option<Machine>>> + Send;

    /// Inserts a machine, returning its id.
    fn insert_machine(
        &self,
        name: &str,
        capacity: i64,
    ) -> impl Future<Output = StoreResult<MachineId>> + Send;

    /// Deletes a machine unless a task still requires it.
    fn delete_machine(
        &self,
        machine_id: MachineId,
    ) -> impl Future<Output = StoreResult<MachineDeletion>> + Send;

    // ── tasks ────────────────────────────────────────────────────────────────

    /// All tasks, ordered by id.
    fn list_tasks(&self) -> impl Future<Output = StoreResult<Vec<Task>>> + Send;

    /// All tasks with the name of their machine, ordered by task id.
    fn list_schedule(&self) -> impl Future<Output = StoreResult<Vec<ScheduleRow>>> + Send;

    fn get_task(&self, task_id: TaskId) -> impl Future<Output = StoreResult<Option<Task>>> + Send;

    /// Inserts a Pending task with the next job id.
    ///
    /// `place` receives the latest `end_time` of any task on the task's
    /// machine and returns the provisional `(start, end)`. The read and the
    /// insert share one transaction.
    fn insert_task<F>(
        &self,
        task: NewTask,
        place: F,
    ) -> impl Future<Output = StoreResult<Task>> + Send
    where
        F: FnOnce(Option<DateTime<Utc>>) -> (DateTime<Utc>, DateTime<Utc>) + Send;

    /// Applies `patch`, resets the task to Pending and clears its times.
    /// Returns `false` if the task does not exist.
    fn update_task(
        &self,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Sets the status, optionally clearing both timestamps.
    /// Returns `false` if the task does not exist.
    fn set_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        clear_times: bool,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Deletes a task with its precedence edges and production logs.
    /// Returns `false` if the task does not exist.
    fn delete_task(&self, task_id: TaskId) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Marks every placed task Scheduled with its new times, all or nothing.
    fn apply_schedule(
        &self,
        placements: &[Placement],
    ) -> impl Future<Output = StoreResult<()>> + Send;

    // ── precedences ──────────────────────────────────────────────────────────

    fn list_precedences(&self) -> impl Future<Output = StoreResult<Vec<PrecedenceEdge>>> + Send;

    /// Inserts an edge. Returns `false` if it already existed.
    fn insert_precedence(
        &self,
        edge: PrecedenceEdge,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Deletes an edge. Returns `false` if it did not exist.
    fn delete_precedence(
        &self,
        edge: PrecedenceEdge,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    // ── production logs ──────────────────────────────────────────────────────

    fn insert_production_log(
        &self,
        task_id: TaskId,
        resource_used: &str,
        product_count: i64,
    ) -> impl Future<Output = StoreResult<ProductionLog>> + Send;
}
