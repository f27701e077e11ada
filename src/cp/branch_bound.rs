//! Exact branch-and-bound solver for interval scheduling models.
//!
//! # Algorithm
//!
//! 1. Pin fixed intervals and fold their precedences into release times and
//!    deadlines of movable intervals.
//! 2. Reject precedence cycles and empty domains up front (proved infeasible).
//! 3. Seed an incumbent with greedy serial schedule-generation passes: two
//!    deterministic priority rules plus seeded random restarts.
//! 4. Depth-first search over precedence-feasible orderings. Each branch
//!    places one interval at its earliest precedence- and resource-feasible
//!    start (serial SGS). Placements are explored in non-decreasing start
//!    order, which still reaches every active schedule, and nodes are pruned
//!    by critical-path and machine-load lower bounds.
//!
//! An exhausted search proves optimality. When the time limit stops the
//! search, the incumbent is returned as `Feasible`.
//!
//! # Reference
//! - Kolisch (1996), "Serial and parallel resource-constrained project
//!   scheduling methods revisited"
//! - Brucker (2007), "Scheduling Algorithms", Ch. 4 (branch and bound)

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::model::{CpAssignment, CpConstraint, CpModel, IntervalValue};
use super::solver::{CpSolution, CpSolver, SolveOutcome, SolveStats, SolverConfig};

/// Marks an interval whose end does not reach the objective.
const NO_TAIL: i64 = i64::MIN;

/// Branch-and-bound [`CpSolver`].
///
/// # Example
/// ```
/// use shopfloor_scheduler::cp::{BranchAndBoundSolver, CpModel, CpSolver, IntervalVar, Objective, SolverConfig};
///
/// let mut model = CpModel::new("demo", 1_000);
/// model.add_interval(IntervalVar::new(1, 0, 940, 60, 1_000));
/// model.add_interval(IntervalVar::new(2, 0, 970, 30, 1_000));
/// model.add_no_overlap(vec![1, 2]);
/// model.set_objective(Objective::MinimizeMaxEnd { intervals: vec![1, 2] });
///
/// let solution = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
/// assert_eq!(solution.outcome.objective(), Some(90));
/// ```
#[derive(Debug, Clone)]
pub struct BranchAndBoundSolver {
    memo_limit: usize,
}

impl BranchAndBoundSolver {
    /// Creates a solver with the default memo size.
    pub fn new() -> Self {
        Self { memo_limit: 50_000 }
    }

    /// Caps the number of remembered search states.
    pub fn with_memo_limit(mut self, limit: usize) -> Self {
        self.memo_limit = limit;
        self
    }
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();

        if let Err(err) = model.check() {
            return CpSolution::new(
                SolveOutcome::ModelError(err),
                SolveStats {
                    elapsed: started.elapsed(),
                    ..SolveStats::default()
                },
            );
        }

        let Some(problem) = Problem::prepare(model) else {
            debug!(model = model.name(), "model rejected before search");
            return CpSolution::new(
                SolveOutcome::Infeasible,
                SolveStats {
                    elapsed: started.elapsed(),
                    ..SolveStats::default()
                },
            );
        };

        let deadline = config.time_limit.and_then(|limit| started.checked_add(limit));
        let mut search = Search::new(&problem, self.memo_limit, deadline);
        search.seed_incumbent(config);
        let seeded = search.best_objective();
        search.dfs(i64::MIN);

        let stats = SolveStats {
            nodes: search.nodes,
            elapsed: started.elapsed(),
            hit_time_limit: search.timed_out,
        };
        debug!(
            model = model.name(),
            nodes = stats.nodes,
            seeded,
            best = search.best_objective(),
            timed_out = stats.hit_time_limit,
            "branch-and-bound finished"
        );

        let outcome = match search.best.take() {
            None => SolveOutcome::Infeasible,
            Some((starts, objective)) => {
                let assignment = problem.decode(&starts);
                if search.timed_out {
                    SolveOutcome::Feasible {
                        assignment,
                        objective,
                    }
                } else {
                    SolveOutcome::Optimal {
                        assignment,
                        objective,
                    }
                }
            }
        };
        CpSolution::new(outcome, stats)
    }
}

/// A resource group: at most `capacity` members may overlap.
#[derive(Debug)]
struct Group {
    capacity: i64,
    members: Vec<usize>,
}

/// Index-based view of a model, with static bounds precomputed.
#[derive(Debug)]
struct Problem {
    ids: Vec<i64>,
    duration: Vec<i64>,
    earliest: Vec<i64>,
    latest: Vec<i64>,
    fixed: Vec<bool>,
    /// Predecessors of movable intervals (fixed ones included) with delays.
    preds: Vec<Vec<(usize, i64)>>,
    /// Movable successors with delays.
    succs: Vec<Vec<(usize, i64)>>,
    movable_preds: Vec<usize>,
    groups: Vec<Group>,
    groups_of: Vec<Vec<usize>>,
    in_objective: Vec<bool>,
    /// Longest path from an interval's end to an objective end.
    tail: Vec<i64>,
    /// Topological order of movable intervals.
    order: Vec<usize>,
}

impl Problem {
    /// Builds the index view. Returns `None` if the model is provably
    /// infeasible (cycle, empty domain, violated committed precedence).
    fn prepare(model: &CpModel) -> Option<Self> {
        let n = model.interval_count();
        let horizon = model.horizon();
        let index: HashMap<i64, usize> = model
            .intervals()
            .iter()
            .enumerate()
            .map(|(i, iv)| (iv.id, i))
            .collect();

        let mut ids = Vec::with_capacity(n);
        let mut duration = Vec::with_capacity(n);
        let mut earliest = Vec::with_capacity(n);
        let mut latest = Vec::with_capacity(n);
        let mut fixed = Vec::with_capacity(n);
        for iv in model.intervals() {
            ids.push(iv.id);
            duration.push(iv.duration);
            fixed.push(iv.fixed);
            if iv.fixed {
                earliest.push(iv.start_min);
                latest.push(iv.start_min);
            } else {
                earliest.push(iv.start_min.max(0));
                latest.push(iv.latest_start().min(horizon - iv.duration));
            }
        }

        let mut preds = vec![Vec::new(); n];
        let mut succs = vec![Vec::new(); n];
        let mut movable_preds = vec![0usize; n];
        let mut groups = Vec::new();

        for constraint in model.constraints() {
            match constraint {
                CpConstraint::Precedence {
                    before,
                    after,
                    min_delay,
                } => {
                    let (b, a) = (index[before], index[after]);
                    match (fixed[b], fixed[a]) {
                        (true, true) => {
                            if earliest[a] < earliest[b] + duration[b] + min_delay {
                                return None;
                            }
                        }
                        (true, false) => preds[a].push((b, *min_delay)),
                        (false, true) => {
                            latest[b] = latest[b].min(earliest[a] - min_delay - duration[b]);
                        }
                        (false, false) => {
                            preds[a].push((b, *min_delay));
                            succs[b].push((a, *min_delay));
                            movable_preds[a] += 1;
                        }
                    }
                }
                CpConstraint::NoOverlap { intervals } => {
                    let members = dedup_members(intervals.iter().map(|id| index[id]));
                    groups.push(Group {
                        capacity: 1,
                        members,
                    });
                }
                CpConstraint::Cumulative {
                    intervals,
                    capacity,
                } => {
                    let members = dedup_members(
                        intervals
                            .iter()
                            .map(|id| index[id])
                            .filter(|&i| duration[i] > 0),
                    );
                    groups.push(Group {
                        capacity: *capacity,
                        members,
                    });
                }
            }
        }

        // Groups that can never be overloaded, or hold only committed work,
        // constrain nothing.
        groups.retain(|g| {
            g.members.len() as i64 > g.capacity && g.members.iter().any(|&m| !fixed[m])
        });
        let mut groups_of = vec![Vec::new(); n];
        for (g, group) in groups.iter().enumerate() {
            for &m in &group.members {
                if !fixed[m] {
                    groups_of[m].push(g);
                }
            }
        }

        let order = topological_order(&fixed, &succs, &movable_preds)?;

        // Forward pass: earliest starts. Backward pass: latest starts.
        for &i in &order {
            for &(p, delay) in &preds[i] {
                earliest[i] = earliest[i].max(earliest[p] + duration[p] + delay);
            }
        }
        for &i in order.iter().rev() {
            for &(s, delay) in &succs[i] {
                latest[i] = latest[i].min(latest[s] - delay - duration[i]);
            }
        }
        if order.iter().any(|&i| earliest[i] > latest[i]) {
            return None;
        }

        let mut in_objective = vec![false; n];
        if let Some(objective) = model.objective() {
            for id in objective.intervals() {
                in_objective[index[id]] = true;
            }
        }
        let mut tail = vec![NO_TAIL; n];
        for &i in order.iter().rev() {
            let mut t = if in_objective[i] { 0 } else { NO_TAIL };
            for &(s, delay) in &succs[i] {
                if tail[s] != NO_TAIL {
                    t = t.max(delay + duration[s] + tail[s]);
                }
            }
            tail[i] = t;
        }

        Some(Self {
            ids,
            duration,
            earliest,
            latest,
            fixed,
            preds,
            succs,
            movable_preds,
            groups,
            groups_of,
            in_objective,
            tail,
            order,
        })
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn decode(&self, starts: &[Option<i64>]) -> CpAssignment {
        starts
            .iter()
            .enumerate()
            .filter_map(|(i, start)| {
                start.map(|s| {
                    (
                        self.ids[i],
                        IntervalValue {
                            start: s,
                            end: s + self.duration[i],
                        },
                    )
                })
            })
            .collect()
    }
}

fn dedup_members(members: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut seen = HashSet::new();
    members.filter(|m| seen.insert(*m)).collect()
}

/// Kahn's algorithm over movable intervals. `None` on a cycle.
fn topological_order(fixed: &[bool], succs: &[Vec<(usize, i64)>], movable_preds: &[usize]) -> Option<Vec<usize>> {
    let mut remaining = movable_preds.to_vec();
    let mut ready: Vec<usize> = (0..fixed.len())
        .filter(|&i| !fixed[i] && remaining[i] == 0)
        .collect();
    let movable = fixed.iter().filter(|f| !**f).count();
    let mut order = Vec::with_capacity(movable);

    while let Some(i) = ready.pop() {
        order.push(i);
        for &(s, _) in &succs[i] {
            remaining[s] -= 1;
            if remaining[s] == 0 {
                ready.push(s);
            }
        }
    }

    (order.len() == movable).then_some(order)
}

/// Mutable search state over a prepared problem.
struct Search<'a> {
    p: &'a Problem,
    start: Vec<Option<i64>>,
    busy: Vec<Vec<(i64, i64)>>,
    pending_preds: Vec<usize>,
    placed: usize,
    movable: usize,
    obj_max: i64,
    best: Option<(Vec<Option<i64>>, i64)>,
    memo: HashSet<(Vec<i64>, i64)>,
    memo_limit: usize,
    nodes: u64,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn new(p: &'a Problem, memo_limit: usize, deadline: Option<Instant>) -> Self {
        let n = p.len();
        let mut start = vec![None; n];
        let mut obj_max = 0;
        for i in 0..n {
            if p.fixed[i] {
                start[i] = Some(p.earliest[i]);
                if p.in_objective[i] {
                    obj_max = obj_max.max(p.earliest[i] + p.duration[i]);
                }
            }
        }
        let busy = p
            .groups
            .iter()
            .map(|g| {
                g.members
                    .iter()
                    .filter(|&&m| p.fixed[m])
                    .map(|&m| (p.earliest[m], p.earliest[m] + p.duration[m]))
                    .collect()
            })
            .collect();

        Self {
            p,
            start,
            busy,
            pending_preds: p.movable_preds.clone(),
            placed: 0,
            movable: p.order.len(),
            obj_max,
            best: None,
            memo: HashSet::new(),
            memo_limit,
            nodes: 0,
            deadline,
            timed_out: false,
        }
    }

    fn best_objective(&self) -> i64 {
        self.best.as_ref().map_or(i64::MAX, |(_, obj)| *obj)
    }

    fn is_eligible(&self, i: usize) -> bool {
        !self.p.fixed[i] && self.start[i].is_none() && self.pending_preds[i] == 0
    }

    fn eligible(&self) -> Vec<usize> {
        (0..self.p.len()).filter(|&i| self.is_eligible(i)).collect()
    }

    /// Earliest start allowed by placed predecessors.
    fn ready_time(&self, i: usize) -> i64 {
        let p = self.p;
        p.preds[i].iter().fold(p.earliest[i], |acc, &(q, delay)| match self.start[q] {
            Some(s) => acc.max(s + p.duration[q] + delay),
            None => acc,
        })
    }

    /// Earliest resource-feasible start at or after `ready`, within the
    /// interval's latest start.
    fn earliest_feasible(&self, i: usize, ready: i64) -> Option<i64> {
        let p = self.p;
        let latest = p.latest[i];
        if ready > latest {
            return None;
        }
        let d = p.duration[i];
        let mut candidates = vec![ready];
        for &g in &p.groups_of[i] {
            candidates.extend(
                self.busy[g]
                    .iter()
                    .map(|&(_, end)| end)
                    .filter(|&end| end > ready && end <= latest),
            );
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
            .into_iter()
            .find(|&t| p.groups_of[i].iter().all(|&g| self.fits(g, t, d)))
    }

    fn fits(&self, g: usize, t: i64, d: i64) -> bool {
        let capacity = self.p.groups[g].capacity;
        let busy = &self.busy[g];
        if capacity == 1 {
            return busy.iter().all(|&(s, e)| !(t + d > s && e > t));
        }
        if d == 0 {
            return true;
        }
        let end = t + d;
        let mut events: Vec<(i64, i64)> = busy
            .iter()
            .filter(|&&(s, e)| s < end && e > t)
            .flat_map(|&(s, e)| [(s.max(t), 1), (e.min(end), -1)])
            .collect();
        // Releases sort before acquisitions at the same instant.
        events.sort_unstable();
        let mut load = 0;
        for (_, delta) in events {
            load += delta;
            if load >= capacity {
                return false;
            }
        }
        true
    }

    /// Places `i` at `t`; returns the previous objective high-water mark.
    fn place(&mut self, i: usize, t: i64) -> i64 {
        let p = self.p;
        let end = t + p.duration[i];
        self.start[i] = Some(t);
        for &g in &p.groups_of[i] {
            self.busy[g].push((t, end));
        }
        for &(s, _) in &p.succs[i] {
            self.pending_preds[s] -= 1;
        }
        self.placed += 1;
        let previous = self.obj_max;
        if p.in_objective[i] {
            self.obj_max = self.obj_max.max(end);
        }
        previous
    }

    /// Reverts the most recent placement of `i`.
    fn unplace(&mut self, i: usize, previous_obj: i64) {
        let p = self.p;
        self.start[i] = None;
        for &g in &p.groups_of[i] {
            self.busy[g].pop();
        }
        for &(s, _) in &p.succs[i] {
            self.pending_preds[s] += 1;
        }
        self.placed -= 1;
        self.obj_max = previous_obj;
    }

    fn record_leaf(&mut self) {
        if self.obj_max < self.best_objective() {
            self.best = Some((self.start.clone(), self.obj_max));
        }
    }

    /// Lower bound on the objective of any completion, or `None` when some
    /// unplaced interval can no longer meet its latest start.
    fn lower_bound(&self) -> Option<i64> {
        let p = self.p;
        let mut head = vec![0i64; p.len()];
        let mut bound = self.obj_max;

        for &i in &p.order {
            if self.start[i].is_some() {
                continue;
            }
            let mut h = p.earliest[i];
            for &(q, delay) in &p.preds[i] {
                let ready = match self.start[q] {
                    Some(s) => s + p.duration[q] + delay,
                    None => head[q] + p.duration[q] + delay,
                };
                h = h.max(ready);
            }
            if h > p.latest[i] {
                return None;
            }
            head[i] = h;
            if p.tail[i] != NO_TAIL {
                bound = bound.max(h + p.duration[i] + p.tail[i]);
            }
        }

        for group in &p.groups {
            let mut total = 0;
            let mut min_head = i64::MAX;
            let mut min_tail = i64::MAX;
            for &m in &group.members {
                if p.fixed[m] || self.start[m].is_some() || p.tail[m] == NO_TAIL {
                    continue;
                }
                total += p.duration[m];
                min_head = min_head.min(head[m]);
                min_tail = min_tail.min(p.tail[m]);
            }
            if min_head != i64::MAX {
                let span = (total + group.capacity - 1) / group.capacity;
                bound = bound.max(min_head + span + min_tail);
            }
        }

        Some(bound)
    }

    /// Records the state; `false` if it was already explored.
    fn remember(&mut self, last_start: i64) -> bool {
        if self.memo.len() >= self.memo_limit {
            return true;
        }
        let key: Vec<i64> = self.start.iter().map(|s| s.unwrap_or(-1)).collect();
        self.memo.insert((key, last_start))
    }

    fn check_deadline(&mut self) {
        if self.nodes % 256 == 1 && self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.timed_out = true;
        }
    }

    fn dfs(&mut self, last_start: i64) {
        self.nodes += 1;
        self.check_deadline();
        if self.timed_out {
            return;
        }

        // Intervals outside every resource group go straight to their
        // ready time; no ordering decision involves them.
        let mut auto_placed: Vec<(usize, i64)> = Vec::new();
        let mut dead = false;
        while let Some(i) =
            (0..self.p.len()).find(|&i| self.is_eligible(i) && self.p.groups_of[i].is_empty())
        {
            let ready = self.ready_time(i);
            if ready > self.p.latest[i] {
                dead = true;
                break;
            }
            let previous = self.place(i, ready);
            auto_placed.push((i, previous));
        }

        if !dead {
            self.expand(last_start);
        }

        for (i, previous) in auto_placed.into_iter().rev() {
            self.unplace(i, previous);
        }
    }

    fn expand(&mut self, last_start: i64) {
        if self.placed == self.movable {
            self.record_leaf();
            return;
        }
        match self.lower_bound() {
            Some(bound) if bound < self.best_objective() => {}
            _ => return,
        }
        if !self.remember(last_start) {
            return;
        }

        let p = self.p;
        let mut children: Vec<(i64, i64, usize)> = Vec::new();
        for i in self.eligible() {
            let ready = self.ready_time(i);
            let Some(t) = self.earliest_feasible(i, ready) else {
                continue;
            };
            if t < last_start {
                continue;
            }
            let finish = t + p.duration[i] + p.tail[i].max(0);
            children.push((finish, t, i));
        }
        children.sort_unstable();

        for (finish, t, i) in children {
            if self.timed_out {
                return;
            }
            let child_bound = if p.tail[i] == NO_TAIL {
                self.obj_max
            } else {
                self.obj_max.max(finish)
            };
            if child_bound >= self.best_objective() {
                continue;
            }
            let previous = self.place(i, t);
            self.dfs(t);
            self.unplace(i, previous);
        }
    }

    /// Greedy serial SGS passes to obtain a first incumbent.
    fn seed_incumbent(&mut self, config: &SolverConfig) {
        let p = self.p;
        let n = p.len();

        let by_latest_start: Vec<i64> = p.latest.clone();
        self.greedy_pass(&by_latest_start);

        let by_critical_path: Vec<i64> = (0..n)
            .map(|i| -(p.duration[i] + p.tail[i].max(0)))
            .collect();
        self.greedy_pass(&by_critical_path);

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut ranks: Vec<i64> = (0..n as i64).collect();
        for _ in 0..config.restarts {
            ranks.shuffle(&mut rng);
            self.greedy_pass(&ranks);
        }
    }

    /// One serial SGS pass: repeatedly place the eligible interval with the
    /// smallest priority value at its earliest feasible start.
    fn greedy_pass(&mut self, priority: &[i64]) {
        let mut stack: Vec<(usize, i64)> = Vec::new();
        loop {
            if self.placed == self.movable {
                self.record_leaf();
                break;
            }
            let mut eligible = self.eligible();
            eligible.sort_by_key(|&i| (priority[i], i));
            let choice = eligible.into_iter().find_map(|i| {
                let ready = self.ready_time(i);
                self.earliest_feasible(i, ready).map(|t| (i, t))
            });
            let Some((i, t)) = choice else {
                break;
            };
            let previous = self.place(i, t);
            stack.push((i, previous));
        }
        for (i, previous) in stack.into_iter().rev() {
            self.unplace(i, previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::{IntervalVar, ModelError, Objective};
    use std::time::Duration;

    const HORIZON: i64 = 10_000;

    fn movable(id: i64, duration: i64) -> IntervalVar {
        IntervalVar::new(id, 0, HORIZON - duration, duration, HORIZON)
    }

    fn model_with(intervals: Vec<IntervalVar>) -> CpModel {
        let mut model = CpModel::new("test", HORIZON);
        let objective: Vec<i64> = intervals.iter().filter(|i| !i.fixed).map(|i| i.id).collect();
        for iv in intervals {
            model.add_interval(iv);
        }
        model.set_objective(Objective::MinimizeMaxEnd {
            intervals: objective,
        });
        model
    }

    fn exact() -> SolverConfig {
        SolverConfig::default().with_time_limit(None)
    }

    fn solve(model: &CpModel) -> CpSolution {
        BranchAndBoundSolver::new().solve(model, &exact())
    }

    #[test]
    fn test_single_machine_sums_durations() {
        let mut model = model_with(vec![movable(1, 60), movable(2, 30), movable(3, 45)]);
        model.add_no_overlap(vec![1, 2, 3]);

        let solution = solve(&model);
        assert!(matches!(solution.outcome, SolveOutcome::Optimal { .. }));
        assert_eq!(solution.outcome.objective(), Some(135));
        let assignment = solution.outcome.assignment().unwrap();
        assert!(model.verify(assignment).is_empty());
    }

    #[test]
    fn test_unconstrained_machine_runs_in_parallel() {
        let model = model_with(vec![movable(1, 60), movable(2, 30)]);
        let solution = solve(&model);
        assert_eq!(solution.outcome.objective(), Some(60));
        let assignment = solution.outcome.assignment().unwrap();
        assert_eq!(assignment[&1].start, 0);
        assert_eq!(assignment[&2].start, 0);
    }

    #[test]
    fn test_precedence_chain_across_machines() {
        let mut model = model_with(vec![movable(1, 60), movable(2, 30), movable(3, 20)]);
        model.add_precedence(1, 2, 0);
        model.add_precedence(2, 3, 0);

        let solution = solve(&model);
        let assignment = solution.outcome.assignment().unwrap();
        assert_eq!(assignment[&2].start, 60);
        assert_eq!(assignment[&3].start, 90);
        assert_eq!(solution.outcome.objective(), Some(110));
    }

    #[test]
    fn test_interleaved_machines() {
        // M1 runs A(40) and C(10); M2 runs B(10) and D(40). B -> C, A -> D.
        // Starting C first delays A and D to a makespan of 100.
        let mut model = model_with(vec![movable(1, 40), movable(2, 10), movable(3, 10), movable(4, 40)]);
        model.add_no_overlap(vec![1, 3]);
        model.add_no_overlap(vec![2, 4]);
        model.add_precedence(2, 3, 0);
        model.add_precedence(1, 4, 0);

        let solution = solve(&model);
        assert!(matches!(solution.outcome, SolveOutcome::Optimal { .. }));
        assert_eq!(solution.outcome.objective(), Some(80));
        assert!(model.verify(solution.outcome.assignment().unwrap()).is_empty());
    }

    #[test]
    fn test_precedence_cycle_is_infeasible() {
        let mut model = model_with(vec![movable(1, 60), movable(2, 30)]);
        model.add_no_overlap(vec![1, 2]);
        model.add_precedence(1, 2, 0);
        model.add_precedence(2, 1, 0);

        let solution = solve(&model);
        assert_eq!(solution.outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_horizon_overflow_is_infeasible() {
        let mut model = CpModel::new("tight", 100);
        model.add_interval(IntervalVar::new(1, 0, 40, 60, 100));
        model.add_interval(IntervalVar::new(2, 0, 50, 50, 100));
        model.add_precedence(1, 2, 0);
        model.set_objective(Objective::MinimizeMaxEnd {
            intervals: vec![1, 2],
        });

        assert_eq!(solve(&model).outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_duration_beyond_horizon_is_infeasible() {
        let mut model = CpModel::new("long", 100);
        model.add_interval(IntervalVar::new(1, 0, 100, 150, 100));
        model.set_objective(Objective::MinimizeMaxEnd { intervals: vec![1] });
        assert_eq!(solve(&model).outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_capacity_overcommit_within_horizon_is_infeasible() {
        let mut model = CpModel::new("full", 100);
        for id in 1..=3 {
            model.add_interval(IntervalVar::new(id, 0, 60, 40, 100));
        }
        model.add_no_overlap(vec![1, 2, 3]);
        model.set_objective(Objective::MinimizeMaxEnd {
            intervals: vec![1, 2, 3],
        });
        assert_eq!(solve(&model).outcome, SolveOutcome::Infeasible);
    }

    #[test]
    fn test_negative_duration_is_model_error() {
        let model = model_with(vec![IntervalVar::new(1, 0, 100, -10, HORIZON)]);
        assert_eq!(
            solve(&model).outcome,
            SolveOutcome::ModelError(ModelError::NegativeDuration { id: 1, duration: -10 })
        );
    }

    #[test]
    fn test_cumulative_capacity() {
        let mut model = model_with(vec![movable(1, 10), movable(2, 10), movable(3, 10)]);
        model.add_cumulative(vec![1, 2, 3], 2);

        let solution = solve(&model);
        assert_eq!(solution.outcome.objective(), Some(20));
        assert!(model.verify(solution.outcome.assignment().unwrap()).is_empty());
    }

    #[test]
    fn test_fixed_interval_blocks_machine() {
        let mut model = model_with(vec![IntervalVar::fixed(100, 10, 30), movable(1, 20), movable(2, 10)]);
        model.add_no_overlap(vec![100, 1, 2]);

        let solution = solve(&model);
        let assignment = solution.outcome.assignment().unwrap();
        // The 10-minute task fits before the committed block; the other follows it.
        assert_eq!(assignment[&2].start, 0);
        assert_eq!(assignment[&1].start, 40);
        assert_eq!(assignment[&100].start, 10);
        assert_eq!(solution.outcome.objective(), Some(60));
    }

    #[test]
    fn test_fixed_predecessor_releases_successor() {
        let mut model = model_with(vec![IntervalVar::fixed(100, 0, 45), movable(1, 15)]);
        model.add_precedence(100, 1, 0);

        let solution = solve(&model);
        assert_eq!(solution.outcome.assignment().unwrap()[&1].start, 45);
        assert_eq!(solution.outcome.objective(), Some(60));
    }

    #[test]
    fn test_zero_time_limit_returns_feasible_incumbent() {
        let mut model = model_with((1..=6).map(|id| movable(id, 10 * id)).collect());
        model.add_no_overlap((1..=6).collect());

        let config = SolverConfig::default().with_time_limit(Some(Duration::ZERO));
        let solution = BranchAndBoundSolver::new().solve(&model, &config);
        assert!(matches!(solution.outcome, SolveOutcome::Feasible { .. }));
        assert!(solution.stats.hit_time_limit);
        assert_eq!(solution.outcome.objective(), Some(210));
    }

    #[test]
    fn test_empty_model_is_optimal() {
        let model = model_with(vec![]);
        let solution = solve(&model);
        assert_eq!(
            solution.outcome,
            SolveOutcome::Optimal {
                assignment: CpAssignment::new(),
                objective: 0
            }
        );
    }
}
