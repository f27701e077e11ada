//! Problem assembly: persisted rows → one solvable snapshot.
//!
//! The backlog is every task that is neither Completed nor Scheduled.
//! Scheduled tasks still running at or after the anchor become committed
//! occupancy: fixed intervals that block their machine but never move.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::error::Result;
use crate::models::{Assignment, Machine, PrecedenceEdge, Task, TaskId, TaskStatus};
use crate::store::ShopStore;

/// A backlog snapshot ready for the model builder.
#[derive(Debug, Clone, Default)]
pub struct AssembledProblem {
    /// All machines.
    pub machines: Vec<Machine>,
    /// Tasks to (re)schedule, ordered by id.
    pub backlog: Vec<Task>,
    /// Committed occupancy as anchor-relative offsets.
    pub committed: Vec<Assignment>,
    /// Edges to enforce: backlog → backlog, and committed → backlog.
    pub edges: Vec<PrecedenceEdge>,
}

impl AssembledProblem {
    /// Whether there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty()
    }
}

/// Reads machines, tasks and edges from the store and assembles them.
pub async fn load<S: ShopStore>(
    store: &S,
    anchor: DateTime<Utc>,
    respect_committed: bool,
) -> Result<AssembledProblem> {
    let machines = store.list_machines().await?;
    let tasks = store.list_tasks().await?;
    let edges = store.list_precedences().await?;
    Ok(assemble(machines, tasks, &edges, anchor, respect_committed))
}

/// Splits tasks into backlog and committed occupancy and filters edges.
pub fn assemble(
    machines: Vec<Machine>,
    tasks: Vec<Task>,
    edges: &[PrecedenceEdge],
    anchor: DateTime<Utc>,
    respect_committed: bool,
) -> AssembledProblem {
    let mut backlog = Vec::new();
    let mut committed = Vec::new();

    for task in tasks {
        if task.status.is_backlog() {
            backlog.push(task);
        } else if respect_committed && task.status == TaskStatus::Scheduled {
            if let Some(block) = committed_block(&task, anchor) {
                committed.push(block);
            }
        }
    }

    let backlog_ids: HashSet<TaskId> = backlog.iter().map(|t| t.task_id).collect();
    let committed_ids: HashSet<TaskId> = committed.iter().map(|c| c.task_id).collect();
    let is_backlog = |id: TaskId| backlog_ids.contains(&id);
    let is_committed = |id: TaskId| committed_ids.contains(&id);

    let mut kept = Vec::new();
    for edge in edges {
        let (pred, succ) = (edge.predecessor_task_id, edge.successor_task_id);
        if is_backlog(succ) && (is_backlog(pred) || is_committed(pred)) {
            kept.push(*edge);
        } else if is_backlog(pred) && is_committed(succ) {
            debug!(pred, succ, "dropping edge into committed work");
        } else if is_backlog(pred) || is_backlog(succ) {
            debug!(pred, succ, "dropping edge to a task outside the model");
        }
    }

    AssembledProblem {
        machines,
        backlog,
        committed,
        edges: kept,
    }
}

/// Committed occupancy of a Scheduled task, or `None` if it ends at or
/// before the anchor (or has no times).
fn committed_block(task: &Task, anchor: DateTime<Utc>) -> Option<Assignment> {
    let (start, end) = task.span()?;
    if end <= anchor {
        return None;
    }
    let start_offset = floor_minutes(start - anchor).max(0);
    let end_offset = ceil_minutes(end - anchor);
    Some(Assignment::new(
        task.task_id,
        task.required_machine_id,
        start_offset,
        end_offset.max(start_offset),
    ))
}

fn floor_minutes(d: Duration) -> i64 {
    d.num_seconds().div_euclid(60)
}

fn ceil_minutes(d: Duration) -> i64 {
    let secs = d.num_seconds();
    secs.div_euclid(60) + i64::from(secs.rem_euclid(60) > 0)
}
