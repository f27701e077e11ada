//! Machine model.
//!
//! Machines are the resources tasks run on. Capacity is the number of
//! tasks a machine can process at the same time.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1.2

use serde::{Deserialize, Serialize};

/// Row identifier of a machine.
pub type MachineId = i64;

/// A machine tasks can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine identifier.
    pub machine_id: MachineId,
    /// Unique human-readable name.
    pub name: String,
    /// Number of tasks processed simultaneously (default: 1).
    pub capacity: i64,
}

/// How a machine's capacity limits overlapping work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineMode {
    /// One task at a time (disjunctive resource).
    Exclusive,
    /// At most `n` tasks at a time.
    Parallel(i64),
}

impl Machine {
    /// Creates an exclusive machine.
    pub fn new(machine_id: MachineId, name: impl Into<String>) -> Self {
        Self {
            machine_id,
            name: name.into(),
            capacity: 1,
        }
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether the machine processes one task at a time.
    pub fn is_exclusive(&self) -> bool {
        self.capacity == 1
    }

    /// Capacity interpreted as a scheduling mode.
    pub fn mode(&self) -> MachineMode {
        MachineMode::from_capacity(self.capacity)
    }
}

impl MachineMode {
    /// Capacity 1 (or less) is exclusive; anything larger runs in parallel.
    pub fn from_capacity(capacity: i64) -> Self {
        if capacity <= 1 {
            MachineMode::Exclusive
        } else {
            MachineMode::Parallel(capacity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_defaults_to_exclusive() {
        let m = Machine::new(1, "Lathe");
        assert_eq!(m.capacity, 1);
        assert!(m.is_exclusive());
        assert_eq!(m.mode(), MachineMode::Exclusive);
    }

    #[test]
    fn test_parallel_machine() {
        let m = Machine::new(2, "Oven").with_capacity(3);
        assert!(!m.is_exclusive());
        assert_eq!(m.mode(), MachineMode::Parallel(3));
    }
}
