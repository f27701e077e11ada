//! Precedence edges and production logs.
//!
//! Edges record "predecessor must finish before successor starts". They are
//! stored independently of the task lifecycle; the set is expected to be a
//! DAG but nothing enforces that on insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// An ordered (predecessor, successor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrecedenceEdge {
    /// Task that must finish first.
    pub predecessor_task_id: TaskId,
    /// Task that may only start afterwards.
    pub successor_task_id: TaskId,
}

impl PrecedenceEdge {
    /// Creates an edge `before → after`.
    pub fn new(before: TaskId, after: TaskId) -> Self {
        Self {
            predecessor_task_id: before,
            successor_task_id: after,
        }
    }

    /// Whether the edge touches the given task.
    pub fn touches(&self, task_id: TaskId) -> bool {
        self.predecessor_task_id == task_id || self.successor_task_id == task_id
    }

    /// Whether predecessor and successor are the same task.
    pub fn is_self_loop(&self) -> bool {
        self.predecessor_task_id == self.successor_task_id
    }
}

/// Actual output recorded against a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionLog {
    /// Log row identifier.
    pub log_id: i64,
    /// Task the output belongs to.
    pub task_id: TaskId,
    /// Free-text description of what was consumed.
    pub resource_used: String,
    /// Units produced.
    pub product_count: i64,
    /// When the log was recorded.
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_touches() {
        let e = PrecedenceEdge::new(1, 2);
        assert!(e.touches(1));
        assert!(e.touches(2));
        assert!(!e.touches(3));
        assert!(!e.is_self_loop());
        assert!(PrecedenceEdge::new(4, 4).is_self_loop());
    }
}
