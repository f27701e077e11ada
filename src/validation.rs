//! Structural checks on the precedence graph of a backlog.
//!
//! The engine does not gate solving on these checks: a cycle simply makes
//! the model infeasible. [`diagnose_infeasibility`] is used afterwards to
//! explain why, using [`find_cycle`] for circular dependencies.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{PrecedenceEdge, Task, TaskId};

/// Finds one cycle in the precedence graph using DFS.
///
/// Returns the tasks on the cycle in edge order, starting and ending at
/// the same task.
///
/// # Algorithm
/// Topological sort via DFS. A back-edge (visiting a node currently in the
/// recursion stack) closes a cycle; the stack slice from that node is the
/// cycle.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
pub fn find_cycle(edges: &[PrecedenceEdge]) -> Option<Vec<TaskId>> {
    // BTreeMap keeps the reported cycle deterministic.
    let mut adj: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
    for edge in edges {
        adj.entry(edge.predecessor_task_id)
            .or_default()
            .push(edge.successor_task_id);
        adj.entry(edge.successor_task_id).or_default();
    }

    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    for &node in adj.keys() {
        if !visited.contains(&node) {
            if let Some(cycle) = cycle_dfs(node, &adj, &mut visited, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn cycle_dfs(
    node: TaskId,
    adj: &BTreeMap<TaskId, Vec<TaskId>>,
    visited: &mut HashSet<TaskId>,
    stack: &mut Vec<TaskId>,
) -> Option<Vec<TaskId>> {
    visited.insert(node);
    stack.push(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if let Some(pos) = stack.iter().position(|&n| n == next) {
                // Back edge → cycle
                let mut cycle = stack[pos..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = cycle_dfs(next, adj, visited, stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    None
}

fn format_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Explains an infeasible backlog, if a structural cause can be found.
///
/// Looks for, in order: a precedence cycle among backlog tasks, a task
/// longer than the horizon, and a precedence chain longer than the horizon.
/// Machine contention is not analyzed.
pub fn diagnose_infeasibility(
    tasks: &[Task],
    edges: &[PrecedenceEdge],
    horizon: i64,
) -> Option<String> {
    let backlog: HashMap<TaskId, i64> = tasks
        .iter()
        .map(|t| (t.task_id, t.duration_minutes()))
        .collect();
    let internal: Vec<PrecedenceEdge> = edges
        .iter()
        .filter(|e| {
            backlog.contains_key(&e.predecessor_task_id)
                && backlog.contains_key(&e.successor_task_id)
        })
        .copied()
        .collect();

    if let Some(cycle) = find_cycle(&internal) {
        return Some(format!(
            "precedence cycle involving tasks {}",
            format_cycle(&cycle)
        ));
    }

    if let Some(task) = tasks.iter().find(|t| t.duration_minutes() > horizon) {
        return Some(format!(
            "task {} needs {} minutes, beyond the {horizon}-minute horizon",
            task.task_id,
            task.duration_minutes()
        ));
    }

    let longest = longest_chain(&backlog, &internal);
    if longest > horizon {
        return Some(format!(
            "precedence chain of {longest} minutes exceeds the {horizon}-minute horizon"
        ));
    }

    None
}

/// Length of the longest precedence chain (sum of durations), assuming a DAG.
fn longest_chain(durations: &HashMap<TaskId, i64>, edges: &[PrecedenceEdge]) -> i64 {
    let mut indegree: HashMap<TaskId, usize> = durations.keys().map(|&id| (id, 0)).collect();
    let mut succs: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for edge in edges {
        succs
            .entry(edge.predecessor_task_id)
            .or_default()
            .push(edge.successor_task_id);
        *indegree.entry(edge.successor_task_id).or_default() += 1;
    }

    let mut finish: HashMap<TaskId, i64> = HashMap::new();
    let mut ready: Vec<TaskId> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut longest = 0;

    while let Some(id) = ready.pop() {
        let end = finish.get(&id).copied().unwrap_or(0) + durations.get(&id).copied().unwrap_or(0);
        longest = longest.max(end);
        for &next in succs.get(&id).into_iter().flatten() {
            let entry = finish.entry(next).or_insert(0);
            *entry = (*entry).max(end);
            if let Some(d) = indegree.get_mut(&next) {
                *d -= 1;
                if *d == 0 {
                    ready.push(next);
                }
            }
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new(1, 1, 1.0),
            Task::new(2, 2, 2.0),
            Task::new(3, 1, 1.5),
        ]
    }

    #[test]
    fn test_find_cycle_in_triangle() {
        // 1 → 2 → 3 → 1
        let edges = vec![
            PrecedenceEdge::new(1, 2),
            PrecedenceEdge::new(2, 3),
            PrecedenceEdge::new(3, 1),
        ];
        assert_eq!(find_cycle(&edges), Some(vec![1, 2, 3, 1]));
    }

    #[test]
    fn test_find_cycle_path() {
        let edges = vec![
            PrecedenceEdge::new(5, 1),
            PrecedenceEdge::new(1, 2),
            PrecedenceEdge::new(2, 1),
        ];
        assert_eq!(find_cycle(&edges), Some(vec![1, 2, 1]));
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let edges = vec![PrecedenceEdge::new(1, 2), PrecedenceEdge::new(2, 3)];
        assert_eq!(find_cycle(&edges), None);
    }

    #[test]
    fn test_diagnose_cycle() {
        let edges = vec![PrecedenceEdge::new(1, 2), PrecedenceEdge::new(2, 1)];
        let message = diagnose_infeasibility(&sample_tasks(), &edges, 10_000).unwrap();
        assert!(message.contains("cycle"));
        assert!(message.contains("1 -> 2 -> 1"));
    }

    #[test]
    fn test_diagnose_ignores_edges_outside_backlog() {
        let edges = vec![PrecedenceEdge::new(1, 7), PrecedenceEdge::new(7, 1)];
        assert_eq!(diagnose_infeasibility(&sample_tasks(), &edges, 10_000), None);
    }

    #[test]
    fn test_diagnose_horizon() {
        let message = diagnose_infeasibility(&sample_tasks(), &[], 100).unwrap();
        assert!(message.contains("task 2"));

        let edges = vec![PrecedenceEdge::new(1, 2), PrecedenceEdge::new(2, 3)];
        // 60 + 120 + 90 = 270 minutes of chained work.
        let message = diagnose_infeasibility(&sample_tasks(), &edges, 200).unwrap();
        assert!(message.contains("270"));
    }
}
