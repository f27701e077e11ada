//! Shop-floor data → CP model.
//!
//! One interval per backlog task, pinned intervals for committed work,
//! finish-to-start precedences, and one resource group per machine:
//! a no-overlap group for exclusive machines, a cumulative group for
//! machines that run several tasks at once.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::model::{CpModel, IntervalId, IntervalVar, Objective};
use super::solver::{CpSolution, CpSolver, SolverConfig};
use crate::models::{Assignment, Machine, MachineId, MachineMode, PrecedenceEdge, Schedule, Task};

/// Builds a CP model from backlog tasks and machines.
///
/// # Example
/// ```
/// use shopfloor_scheduler::cp::{BranchAndBoundSolver, ScheduleCpBuilder, SolverConfig};
/// use shopfloor_scheduler::models::{Machine, PrecedenceEdge, Task};
///
/// let machines = vec![Machine::new(1, "Lathe")];
/// let tasks = vec![Task::new(10, 1, 1.0), Task::new(11, 1, 0.5)];
/// let builder = ScheduleCpBuilder::new(&tasks, &machines)
///     .with_precedences(vec![PrecedenceEdge::new(11, 10)]);
///
/// let (schedule, _) = builder.solve(&BranchAndBoundSolver::new(), &SolverConfig::default(), 1_000);
/// assert_eq!(schedule.makespan(), 90);
/// assert_eq!(schedule.assignment_for_task(10).unwrap().start_offset, 30);
/// ```
pub struct ScheduleCpBuilder<'a> {
    tasks: &'a [Task],
    machines: &'a [Machine],
    precedences: Vec<PrecedenceEdge>,
    committed: Vec<Assignment>,
}

impl<'a> ScheduleCpBuilder<'a> {
    /// Creates a builder over the backlog `tasks`.
    pub fn new(tasks: &'a [Task], machines: &'a [Machine]) -> Self {
        Self {
            tasks,
            machines,
            precedences: Vec::new(),
            committed: Vec::new(),
        }
    }

    /// Sets the precedence edges.
    pub fn with_precedences(mut self, precedences: Vec<PrecedenceEdge>) -> Self {
        self.precedences = precedences;
        self
    }

    /// Sets committed occupancy, as anchor-relative offsets.
    pub fn with_committed(mut self, committed: Vec<Assignment>) -> Self {
        self.committed = committed;
        self
    }

    /// Builds the model for the given horizon (minutes).
    ///
    /// Edges are kept when both ends are modeled and the successor is a
    /// backlog task; anything else would constrain committed work.
    pub fn build(&self, horizon: i64) -> CpModel {
        let mut model = CpModel::new("shopfloor", horizon);

        for task in self.tasks {
            let duration = task.duration_minutes();
            model.add_interval(IntervalVar::new(
                task.task_id,
                0,
                horizon - duration,
                duration,
                horizon,
            ));
        }
        for block in &self.committed {
            model.add_interval(IntervalVar::fixed(
                block.task_id,
                block.start_offset,
                block.duration(),
            ));
        }

        let backlog: HashSet<IntervalId> = self.tasks.iter().map(|t| t.task_id).collect();
        let committed: HashSet<IntervalId> = self.committed.iter().map(|c| c.task_id).collect();
        for edge in &self.precedences {
            let pred = edge.predecessor_task_id;
            let succ = edge.successor_task_id;
            let pred_known = backlog.contains(&pred) || committed.contains(&pred);
            if pred_known && backlog.contains(&succ) {
                model.add_precedence(pred, succ, 0);
            } else {
                debug!(pred, succ, "precedence not modeled");
            }
        }

        let capacities: HashMap<MachineId, i64> = self
            .machines
            .iter()
            .map(|m| (m.machine_id, m.capacity))
            .collect();
        for (machine_id, intervals) in self.intervals_by_machine() {
            if intervals.len() < 2 {
                continue;
            }
            let capacity = capacities.get(&machine_id).copied().unwrap_or(1);
            match MachineMode::from_capacity(capacity) {
                MachineMode::Exclusive => model.add_no_overlap(intervals),
                MachineMode::Parallel(n) => model.add_cumulative(intervals, n),
            }
        }

        self.compose_objective(&mut model);
        model
    }

    /// Sets the objective: minimize the latest backlog end (makespan).
    /// Committed intervals do not count.
    pub fn compose_objective(&self, model: &mut CpModel) {
        model.set_objective(Objective::MinimizeMaxEnd {
            intervals: self.tasks.iter().map(|t| t.task_id).collect(),
        });
    }

    /// Builds and solves, returning the decoded schedule with the raw solution.
    pub fn solve<S: CpSolver + ?Sized>(
        &self,
        solver: &S,
        config: &SolverConfig,
        horizon: i64,
    ) -> (Schedule, CpSolution) {
        let model = self.build(horizon);
        let solution = solver.solve(&model, config);
        let schedule = self.decode_solution(&solution);
        (schedule, solution)
    }

    /// Decodes a solution into backlog assignments. Committed intervals are
    /// left out; they are never re-materialized.
    pub fn decode_solution(&self, solution: &CpSolution) -> Schedule {
        let mut schedule = Schedule::new();
        let Some(values) = solution.outcome.assignment() else {
            return schedule;
        };

        for task in self.tasks {
            if let Some(value) = values.get(&task.task_id) {
                schedule.add_assignment(Assignment::new(
                    task.task_id,
                    task.required_machine_id,
                    value.start,
                    value.end,
                ));
            }
        }
        schedule
    }

    /// Interval ids per machine, backlog and committed alike.
    fn intervals_by_machine(&self) -> BTreeMap<MachineId, Vec<IntervalId>> {
        let mut groups: BTreeMap<MachineId, Vec<IntervalId>> = BTreeMap::new();
        for task in self.tasks {
            groups
                .entry(task.required_machine_id)
                .or_default()
                .push(task.task_id);
        }
        for block in &self.committed {
            groups.entry(block.machine_id).or_default().push(block.task_id);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::CpConstraint;
    use crate::cp::BranchAndBoundSolver;

    fn machines() -> Vec<Machine> {
        vec![Machine::new(1, "Lathe"), Machine::new(2, "Oven").with_capacity(3)]
    }

    #[test]
    fn test_build_intervals() {
        let tasks = vec![Task::new(1, 1, 2.0), Task::new(2, 2, 0.75)];
        let machines = machines();
        let model = ScheduleCpBuilder::new(&tasks, &machines).build(1_000);

        assert_eq!(model.interval_count(), 2);
        let first = model.interval(1).unwrap();
        assert_eq!(first.duration, 120);
        assert_eq!(first.start_min, 0);
        assert_eq!(first.start_max, 880);
        assert_eq!(first.end_max, 1_000);
        assert_eq!(model.interval(2).unwrap().duration, 45);
        // One task per machine: no resource groups.
        assert_eq!(model.constraint_count(), 0);
        assert!(model.check().is_ok());
    }

    #[test]
    fn test_machine_groups_follow_capacity() {
        let tasks = vec![
            Task::new(1, 1, 1.0),
            Task::new(2, 1, 1.0),
            Task::new(3, 2, 1.0),
            Task::new(4, 2, 1.0),
        ];
        let machines = machines();
        let model = ScheduleCpBuilder::new(&tasks, &machines).build(1_000);

        assert!(model
            .constraints()
            .contains(&CpConstraint::NoOverlap { intervals: vec![1, 2] }));
        assert!(model.constraints().contains(&CpConstraint::Cumulative {
            intervals: vec![3, 4],
            capacity: 3
        }));
    }

    #[test]
    fn test_edges_into_committed_work_are_dropped() {
        let tasks = vec![Task::new(1, 1, 1.0), Task::new(2, 1, 1.0)];
        let machines = machines();
        let committed = vec![Assignment::new(9, 1, 0, 30)];
        let model = ScheduleCpBuilder::new(&tasks, &machines)
            .with_committed(committed)
            .with_precedences(vec![
                PrecedenceEdge::new(9, 1),
                PrecedenceEdge::new(2, 9),
                PrecedenceEdge::new(1, 77),
            ])
            .build(1_000);

        let precedences: Vec<_> = model
            .constraints()
            .iter()
            .filter(|c| matches!(c, CpConstraint::Precedence { .. }))
            .collect();
        assert_eq!(
            precedences,
            vec![&CpConstraint::Precedence {
                before: 9,
                after: 1,
                min_delay: 0
            }]
        );
        assert!(model.interval(9).unwrap().fixed);
        assert!(model
            .constraints()
            .contains(&CpConstraint::NoOverlap { intervals: vec![1, 2, 9] }));
    }

    #[test]
    fn test_objective_excludes_committed() {
        let tasks = vec![Task::new(1, 1, 1.0)];
        let machines = machines();
        let model = ScheduleCpBuilder::new(&tasks, &machines)
            .with_committed(vec![Assignment::new(9, 1, 0, 600)])
            .build(1_000);
        assert_eq!(model.objective().unwrap().intervals(), &[1]);
    }

    #[test]
    fn test_solve_and_decode() {
        let tasks = vec![Task::new(1, 1, 1.0), Task::new(2, 1, 0.5), Task::new(3, 2, 0.25)];
        let machines = machines();
        let builder = ScheduleCpBuilder::new(&tasks, &machines)
            .with_precedences(vec![PrecedenceEdge::new(1, 3)])
            .with_committed(vec![Assignment::new(9, 1, 0, 15)]);

        let (schedule, solution) =
            builder.solve(&BranchAndBoundSolver::new(), &SolverConfig::default(), 1_000);

        assert!(solution.is_solution_found());
        assert_eq!(schedule.assignment_count(), 3);
        assert!(schedule.assignment_for_task(9).is_none());
        let first = schedule.assignment_for_task(1).unwrap();
        let third = schedule.assignment_for_task(3).unwrap();
        assert!(third.start_offset >= first.end_offset);
        assert!(schedule
            .assignments
            .iter()
            .filter(|a| a.machine_id == 1)
            .all(|a| a.start_offset >= 15));
        // 15 committed + 60 + 30 on the lathe.
        assert_eq!(schedule.makespan(), 105);
    }

    #[test]
    fn test_decode_infeasible_is_empty() {
        let tasks = vec![Task::new(1, 1, 1.0), Task::new(2, 1, 1.0)];
        let machines = machines();
        let builder = ScheduleCpBuilder::new(&tasks, &machines).with_precedences(vec![
            PrecedenceEdge::new(1, 2),
            PrecedenceEdge::new(2, 1),
        ]);
        let (schedule, solution) =
            builder.solve(&BranchAndBoundSolver::new(), &SolverConfig::default(), 1_000);
        assert!(!solution.is_solution_found());
        assert_eq!(schedule.assignment_count(), 0);
    }
}
