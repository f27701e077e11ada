//! Shop-floor domain models.
//!
//! Provides the persisted entities (tasks, machines, precedence edges,
//! production logs) and the ephemeral solution type ([`Schedule`]).
//!
//! # Domain Mappings
//!
//! | shopfloor | Scheduling theory |
//! |-----------|-------------------|
//! | Task | Operation (single-stage job) |
//! | Machine | Resource with capacity |
//! | PrecedenceEdge | Finish-to-start precedence |
//! | Schedule | Solution in anchor-relative minutes |

mod machine;
mod precedence;
mod schedule;
mod task;

pub use machine::{Machine, MachineId, MachineMode};
pub use precedence::{PrecedenceEdge, ProductionLog};
pub use schedule::{Assignment, Schedule, Violation, ViolationType};
pub use task::{
    duration_minutes, hours_to_duration, Task, TaskId, TaskStatus, UnknownStatus,
    MAX_DURATION_HOURS,
};
