//! Task model.
//!
//! A task is one manufacturing operation: it runs on exactly one required
//! machine for a fixed duration and moves through a small status lifecycle.
//!
//! # Time Representation
//! Persisted times are absolute UTC instants. The solver works in integer
//! minutes relative to a solve anchor; see [`Task::duration_minutes`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MachineId;

/// Row identifier of a task.
pub type TaskId = i64;

/// Lifecycle state of a task.
///
/// Serialized with the same labels operators see and the store persists,
/// including the space in `"In Progress"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting for the next optimization run.
    Pending,
    /// Placed by an optimization run.
    Scheduled,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished.
    Completed,
    /// Abandoned.
    Canceled,
}

/// Returned when a status label is not one of the five known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status: {0}. Must be one of [Pending, Scheduled, In Progress, Completed, Canceled]")]
pub struct UnknownStatus(pub String);

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Scheduled,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Canceled,
    ];

    /// Label used on the wire and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Scheduled => "Scheduled",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Canceled => "Canceled",
        }
    }

    /// Whether a task in this status belongs to the optimization backlog.
    ///
    /// Everything except `Completed` and `Scheduled` is re-planned.
    pub fn is_backlog(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Scheduled)
    }

    /// Whether this status requires both timestamps to be set.
    pub fn requires_times(&self) -> bool {
        matches!(self, TaskStatus::Scheduled | TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A task as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub task_id: TaskId,
    /// Job number, assigned as one past the current maximum on creation.
    pub job_id: i64,
    /// Human-readable name.
    pub name: String,
    /// Processing time in hours (positive).
    pub duration_hours: f64,
    /// Machine the task must run on.
    pub required_machine_id: MachineId,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Planned start, if placed.
    pub start_time: Option<DateTime<Utc>>,
    /// Planned end, if placed.
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a pending, unplaced task.
    pub fn new(task_id: TaskId, machine_id: MachineId, duration_hours: f64) -> Self {
        Self {
            task_id,
            job_id: task_id,
            name: String::new(),
            duration_hours,
            required_machine_id: machine_id,
            status: TaskStatus::Pending,
            start_time: None,
            end_time: None,
        }
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the job id.
    pub fn with_job(mut self, job_id: i64) -> Self {
        self.job_id = job_id;
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets both timestamps.
    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Duration in whole minutes, truncating any fractional minute.
    pub fn duration_minutes(&self) -> i64 {
        duration_minutes(self.duration_hours)
    }

    /// Exact duration at second precision, used for provisional placement.
    pub fn duration(&self) -> Duration {
        hours_to_duration(self.duration_hours)
    }

    /// Whether this task is part of the optimization backlog.
    pub fn is_backlog(&self) -> bool {
        self.status.is_backlog()
    }

    /// Start and end, when both are set.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.start_time.zip(self.end_time)
    }
}

/// Longest accepted task duration: one hundred years.
pub const MAX_DURATION_HOURS: f64 = 24.0 * 365.0 * 100.0;

/// Converts hours to whole minutes, flooring.
pub fn duration_minutes(duration_hours: f64) -> i64 {
    (duration_hours * 60.0).floor() as i64
}

/// Converts hours to a [`Duration`] rounded to the second.
///
/// Callers keep `duration_hours` within [`MAX_DURATION_HOURS`].
pub fn hours_to_duration(duration_hours: f64) -> Duration {
    Duration::seconds((duration_hours * 3600.0).round() as i64)
}
