//! Schedule (solution) model.
//!
//! A schedule assigns every solved task a start and end offset, in whole
//! minutes from the solve anchor. It is ephemeral: the materializer turns it
//! into absolute timestamps and the offsets are never persisted.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};

use super::{MachineId, TaskId};

/// Solved backlog: one assignment per task, in anchor-relative minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub assignments: Vec<Assignment>,
}

/// A task-machine-time assignment, relative to the solve anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned task.
    pub task_id: TaskId,
    /// Machine the task runs on.
    pub machine_id: MachineId,
    /// Start offset (minutes).
    pub start_offset: i64,
    /// End offset (minutes).
    pub end_offset: i64,
}

/// A constraint violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (task or machine).
    pub entity_id: i64,
    /// Human-readable description.
    pub message: String,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Machine allocated beyond its capacity.
    CapacityExceeded,
    /// Task started before its predecessor finished.
    PrecedenceViolation,
    /// Interval leaves its domain (outside the horizon or its start bounds).
    OutOfBounds,
    /// `end - start` differs from the interval duration.
    DurationMismatch,
    /// A model interval has no value in the solution.
    Unassigned,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(task_id: TaskId, machine_id: MachineId, start_offset: i64, end_offset: i64) -> Self {
        Self {
            task_id,
            machine_id,
            start_offset,
            end_offset,
        }
    }

    /// Length in minutes.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end_offset - self.start_offset
    }
}

impl Violation {
    /// Creates a violation.
    pub fn new(violation_type: ViolationType, entity_id: i64, message: impl Into<String>) -> Self {
        Self {
            violation_type,
            entity_id,
            message: message.into(),
        }
    }

    /// Resource over-allocation, reported against one of the intervals.
    pub fn capacity_exceeded(interval_id: i64, message: impl Into<String>) -> Self {
        Self::new(ViolationType::CapacityExceeded, interval_id, message)
    }

    /// Creates a precedence violation.
    pub fn precedence_violation(task_id: TaskId, message: impl Into<String>) -> Self {
        Self::new(ViolationType::PrecedenceViolation, task_id, message)
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Makespan: latest end offset across all assignments (minutes).
    pub fn makespan(&self) -> i64 {
        self.assignments.iter().map(|a| a.end_offset).max().unwrap_or(0)
    }

    /// Finds the assignment for a given task.
    pub fn assignment_for_task(&self, task_id: TaskId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.task_id == task_id)
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.add_assignment(Assignment::new(1, 10, 0, 50));
        s.add_assignment(Assignment::new(2, 20, 10, 40));
        s.add_assignment(Assignment::new(3, 10, 50, 80));
        s
    }

    #[test]
    fn test_schedule_makespan() {
        assert_eq!(sample_schedule().makespan(), 80);
        assert_eq!(Schedule::new().makespan(), 0);
    }

    #[test]
    fn test_assignment_lookup() {
        let s = sample_schedule();
        assert_eq!(s.assignment_for_task(2).unwrap().machine_id, 20);
        assert!(s.assignment_for_task(99).is_none());
    }
}
