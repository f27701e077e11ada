//! CP model: interval variables, constraints and the objective.
//!
//! The model is solver-agnostic. Any [`CpSolver`](super::CpSolver) consumes
//! it; the builder in [`super::builder`] produces it from shop-floor data.
//!
//! # Time Model
//! All bounds are integer minutes in `[0, horizon]`.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::models::{Violation, ViolationType};

/// Identifier of an interval variable (the task id it models).
pub type IntervalId = i64;

/// An interval variable with a fixed duration.
///
/// `start ∈ [start_min, start_max]`, `end = start + duration ≤ end_max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalVar {
    /// Interval identifier.
    pub id: IntervalId,
    /// Earliest start.
    pub start_min: i64,
    /// Latest start.
    pub start_max: i64,
    /// Fixed length.
    pub duration: i64,
    /// Latest end.
    pub end_max: i64,
    /// Pinned intervals are committed work: the solver must not move them.
    pub fixed: bool,
}

impl IntervalVar {
    /// Creates a movable interval.
    pub fn new(id: IntervalId, start_min: i64, start_max: i64, duration: i64, end_max: i64) -> Self {
        Self {
            id,
            start_min,
            start_max,
            duration,
            end_max,
            fixed: false,
        }
    }

    /// Creates an interval pinned at `start`.
    pub fn fixed(id: IntervalId, start: i64, duration: i64) -> Self {
        Self {
            id,
            start_min: start,
            start_max: start,
            duration,
            end_max: start + duration,
            fixed: true,
        }
    }

    /// Latest start honoring both `start_max` and `end_max`.
    pub fn latest_start(&self) -> i64 {
        self.start_max.min(self.end_max - self.duration)
    }
}

/// A model constraint over interval ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpConstraint {
    /// `after.start >= before.end + min_delay`.
    Precedence {
        before: IntervalId,
        after: IntervalId,
        min_delay: i64,
    },
    /// No two listed intervals may overlap (disjunctive resource).
    NoOverlap { intervals: Vec<IntervalId> },
    /// At most `capacity` listed intervals may run at the same time.
    ///
    /// Every interval demands one unit. Zero-length intervals consume none.
    Cumulative {
        intervals: Vec<IntervalId>,
        capacity: i64,
    },
}

/// Optimization objective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    /// Minimize the latest end among the listed intervals.
    MinimizeMaxEnd { intervals: Vec<IntervalId> },
}

impl Objective {
    /// Intervals whose ends define the objective value.
    pub fn intervals(&self) -> &[IntervalId] {
        match self {
            Objective::MinimizeMaxEnd { intervals } => intervals,
        }
    }
}

/// Concrete value of one interval in a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalValue {
    pub start: i64,
    pub end: i64,
}

impl IntervalValue {
    /// Disjunctive overlap: false iff one ends at or before the other starts.
    #[inline]
    pub fn overlaps(&self, other: &IntervalValue) -> bool {
        self.end > other.start && other.end > self.start
    }
}

/// Values for every interval of a model, keyed by interval id.
pub type CpAssignment = BTreeMap<IntervalId, IntervalValue>;

/// Structural defects that make a model malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("horizon must not be negative (got {0})")]
    NegativeHorizon(i64),
    #[error("interval {id} has negative duration {duration}")]
    NegativeDuration { id: IntervalId, duration: i64 },
    #[error("interval {0} is declared twice")]
    DuplicateInterval(IntervalId),
    #[error("constraint references unknown interval {0}")]
    UnknownInterval(IntervalId),
    #[error("precedence {before} -> {after} has negative delay {delay}")]
    NegativeDelay {
        before: IntervalId,
        after: IntervalId,
        delay: i64,
    },
    #[error("cumulative capacity must be at least 1 (got {0})")]
    InvalidCapacity(i64),
    #[error("model has no objective")]
    MissingObjective,
}

/// A constraint-programming model for scheduling.
#[derive(Debug, Clone)]
pub struct CpModel {
    name: String,
    horizon: i64,
    intervals: Vec<IntervalVar>,
    constraints: Vec<CpConstraint>,
    objective: Option<Objective>,
}

impl CpModel {
    /// Creates an empty model over `[0, horizon]`.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            intervals: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    pub fn constraints(&self) -> &[CpConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Adds an interval variable.
    pub fn add_interval(&mut self, interval: IntervalVar) {
        self.intervals.push(interval);
    }

    /// Adds `after.start >= before.end + min_delay`.
    pub fn add_precedence(&mut self, before: IntervalId, after: IntervalId, min_delay: i64) {
        self.constraints.push(CpConstraint::Precedence {
            before,
            after,
            min_delay,
        });
    }

    /// Adds a no-overlap group.
    pub fn add_no_overlap(&mut self, intervals: Vec<IntervalId>) {
        self.constraints.push(CpConstraint::NoOverlap { intervals });
    }

    /// Adds a cumulative group with unit demands.
    pub fn add_cumulative(&mut self, intervals: Vec<IntervalId>, capacity: i64) {
        self.constraints
            .push(CpConstraint::Cumulative { intervals, capacity });
    }

    /// Sets the objective, replacing any previous one.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Number of interval variables.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Looks up an interval by id.
    pub fn interval(&self, id: IntervalId) -> Option<&IntervalVar> {
        self.intervals.iter().find(|i| i.id == id)
    }

    /// Checks the model for structural defects.
    ///
    /// An empty domain (e.g. a duration longer than the horizon) is not a
    /// defect: it makes the model infeasible instead.
    pub fn check(&self) -> Result<(), ModelError> {
        if self.horizon < 0 {
            return Err(ModelError::NegativeHorizon(self.horizon));
        }

        let mut ids = HashSet::new();
        for interval in &self.intervals {
            if interval.duration < 0 {
                return Err(ModelError::NegativeDuration {
                    id: interval.id,
                    duration: interval.duration,
                });
            }
            if !ids.insert(interval.id) {
                return Err(ModelError::DuplicateInterval(interval.id));
            }
        }

        let known = |id: &IntervalId| {
            if ids.contains(id) {
                Ok(())
            } else {
                Err(ModelError::UnknownInterval(*id))
            }
        };

        for constraint in &self.constraints {
            match constraint {
                CpConstraint::Precedence {
                    before,
                    after,
                    min_delay,
                } => {
                    known(before)?;
                    known(after)?;
                    if *min_delay < 0 {
                        return Err(ModelError::NegativeDelay {
                            before: *before,
                            after: *after,
                            delay: *min_delay,
                        });
                    }
                }
                CpConstraint::NoOverlap { intervals } => {
                    intervals.iter().try_for_each(known)?;
                }
                CpConstraint::Cumulative {
                    intervals,
                    capacity,
                } => {
                    if *capacity < 1 {
                        return Err(ModelError::InvalidCapacity(*capacity));
                    }
                    intervals.iter().try_for_each(known)?;
                }
            }
        }

        match &self.objective {
            None => Err(ModelError::MissingObjective),
            Some(objective) => objective.intervals().iter().try_for_each(known),
        }
    }

    /// Objective value of an assignment (0 when the objective set is empty).
    pub fn objective_value(&self, assignment: &CpAssignment) -> i64 {
        self.objective
            .as_ref()
            .map(|o| {
                o.intervals()
                    .iter()
                    .filter_map(|id| assignment.get(id))
                    .map(|v| v.end)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Checks an assignment against every constraint of the model.
    ///
    /// Overlaps among pinned intervals are committed history and are not
    /// reported.
    pub fn verify(&self, assignment: &CpAssignment) -> Vec<Violation> {
        let mut violations = Vec::new();
        let by_id: HashMap<IntervalId, &IntervalVar> =
            self.intervals.iter().map(|i| (i.id, i)).collect();

        for interval in &self.intervals {
            let Some(value) = assignment.get(&interval.id) else {
                violations.push(Violation::new(
                    ViolationType::Unassigned,
                    interval.id,
                    format!("interval {} has no value", interval.id),
                ));
                continue;
            };
            if value.end - value.start != interval.duration {
                violations.push(Violation::new(
                    ViolationType::DurationMismatch,
                    interval.id,
                    format!(
                        "interval {} spans {} minutes, expected {}",
                        interval.id,
                        value.end - value.start,
                        interval.duration
                    ),
                ));
            }
            let out_of_bounds = value.start < interval.start_min
                || value.start > interval.start_max
                || value.end > interval.end_max
                || value.start < 0
                || (!interval.fixed && value.end > self.horizon);
            if out_of_bounds {
                violations.push(Violation::new(
                    ViolationType::OutOfBounds,
                    interval.id,
                    format!(
                        "interval {} at [{}, {}] leaves its domain",
                        interval.id, value.start, value.end
                    ),
                ));
            }
        }

        for constraint in &self.constraints {
            match constraint {
                CpConstraint::Precedence {
                    before,
                    after,
                    min_delay,
                } => {
                    if let (Some(b), Some(a)) = (assignment.get(before), assignment.get(after)) {
                        if a.start < b.end + min_delay {
                            violations.push(Violation::precedence_violation(
                                *after,
                                format!(
                                    "interval {after} starts at {} before {before} ends at {}",
                                    a.start, b.end
                                ),
                            ));
                        }
                    }
                }
                CpConstraint::NoOverlap { intervals } => {
                    for (i, x) in intervals.iter().enumerate() {
                        for y in &intervals[i + 1..] {
                            let both_fixed = by_id.get(x).is_some_and(|v| v.fixed)
                                && by_id.get(y).is_some_and(|v| v.fixed);
                            if both_fixed {
                                continue;
                            }
                            if let (Some(vx), Some(vy)) = (assignment.get(x), assignment.get(y)) {
                                if vx.overlaps(vy) {
                                    violations.push(Violation::capacity_exceeded(
                                        *x,
                                        format!("intervals {x} and {y} overlap"),
                                    ));
                                }
                            }
                        }
                    }
                }
                CpConstraint::Cumulative {
                    intervals,
                    capacity,
                } => {
                    let mut events: Vec<(i64, i64)> = Vec::new();
                    let mut has_movable = false;
                    for id in intervals {
                        if let Some(v) = assignment.get(id) {
                            if v.end > v.start {
                                events.push((v.start, 1));
                                events.push((v.end, -1));
                                has_movable |= by_id.get(id).is_some_and(|iv| !iv.fixed);
                            }
                        }
                    }
                    if !has_movable {
                        continue;
                    }
                    // Ends sort before starts at the same instant.
                    events.sort();
                    let mut load = 0;
                    for (time, delta) in events {
                        load += delta;
                        if load > *capacity {
                            violations.push(Violation::capacity_exceeded(
                                intervals.first().copied().unwrap_or_default(),
                                format!("{load} intervals run at minute {time}, capacity {capacity}"),
                            ));
                            break;
                        }
                    }
                }
            }
        }

        violations
    }
}
