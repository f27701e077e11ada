//! Request and response bodies.
//!
//! Request fields are optional on the wire so that a missing field produces
//! the same 400 message as an invalid one. Each request validates itself into
//! a typed command before any engine call.

use axum::extract::FromRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ServerError;
use crate::engine::TaskUpdate;
use crate::models::{PrecedenceEdge, TaskId, TaskStatus};
use crate::store::ScheduleRow;

/// `axum::Json` with rejections mapped to 400 `{"error": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct ApiJson<T>(pub T);

/// A JSON scalar that may arrive as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Integer value; whole floats and numeric text are accepted.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(*n as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Text form; numbers are rendered as JSON would.
    pub fn into_text(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

// ── machines ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMachineRequest {
    pub name: Option<String>,
    pub capacity: Option<Scalar>,
}

impl CreateMachineRequest {
    /// `(name, capacity)`; capacity defaults to 1.
    pub fn validate(self) -> Result<(String, i64), ServerError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| bad_request("Missing required field: name"))?;
        let capacity = match self.capacity {
            None => 1,
            Some(c) => c
                .as_int()
                .ok_or_else(|| bad_request("capacity must be a positive integer"))?,
        };
        Ok((name, capacity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineCreated {
    pub message: String,
    pub machine_id: i64,
}

// ── tasks ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub name: Option<String>,
    pub duration_hours: Option<Scalar>,
    pub machine_name: Option<String>,
}

/// A validated task creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTaskCommand {
    pub name: String,
    pub duration_hours: f64,
    pub machine_name: String,
}

impl CreateTaskRequest {
    pub fn validate(self) -> Result<NewTaskCommand, ServerError> {
        const MISSING: &str = "Missing required fields (name, duration_hours, machine_name)";
        let name = self.name.filter(|n| !n.trim().is_empty());
        let machine_name = self.machine_name.filter(|n| !n.trim().is_empty());
        let (Some(name), Some(duration), Some(machine_name)) =
            (name, self.duration_hours, machine_name)
        else {
            return Err(bad_request(MISSING));
        };
        let duration_hours = duration
            .as_f64()
            .ok_or_else(|| bad_request("duration_hours must be a number"))?;
        Ok(NewTaskCommand {
            name,
            duration_hours,
            machine_name,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreated {
    pub message: String,
    pub task_id: TaskId,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub duration_hours: Option<Scalar>,
    pub machine_name: Option<String>,
}

impl UpdateTaskRequest {
    /// The engine rejects an update with no fields.
    pub fn validate(self) -> Result<TaskUpdate, ServerError> {
        let duration_hours = self
            .duration_hours
            .map(|d| {
                d.as_f64()
                    .ok_or_else(|| bad_request("duration_hours must be a number"))
            })
            .transpose()?;
        Ok(TaskUpdate {
            name: self.name,
            duration_hours,
            machine_name: self.machine_name,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

impl StatusRequest {
    pub fn validate(self) -> Result<String, ServerError> {
        self.status
            .ok_or_else(|| bad_request("Missing required field: status"))
    }
}

/// One row of `GET /api/schedule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub task_id: TaskId,
    pub job_id: i64,
    pub task_name: String,
    pub duration_hours: f64,
    pub machine_name: String,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<ScheduleRow> for ScheduleEntry {
    fn from(row: ScheduleRow) -> Self {
        let task = row.task;
        Self {
            task_id: task.task_id,
            job_id: task.job_id,
            task_name: task.name,
            duration_hours: task.duration_hours,
            machine_name: row.machine_name,
            status: task.status,
            start_time: task.start_time,
            end_time: task.end_time,
        }
    }
}

/// One row of `GET /api/tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub name: String,
}

// ── precedences ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrecedenceRequest {
    pub predecessor_id: Option<Scalar>,
    pub successor_id: Option<Scalar>,
}

impl PrecedenceRequest {
    pub fn validate(self) -> Result<PrecedenceEdge, ServerError> {
        const MISSING: &str = "Missing required fields (predecessor_id, successor_id)";
        let (Some(pred), Some(succ)) = (self.predecessor_id, self.successor_id) else {
            return Err(bad_request(MISSING));
        };
        match (pred.as_int(), succ.as_int()) {
            (Some(pred), Some(succ)) => Ok(PrecedenceEdge::new(pred, succ)),
            _ => Err(bad_request("predecessor_id and successor_id must be integers")),
        }
    }
}

// ── optimization ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeRequest {
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub message: String,
    pub makespan_minutes: i64,
    pub status: String,
    pub scheduled_tasks: usize,
}

// ── production ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductionLogRequest {
    pub task_id: Option<Scalar>,
    pub resource_used: Option<Scalar>,
    pub product_count: Option<Scalar>,
}

/// A validated production log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionCommand {
    pub task_id: TaskId,
    pub resource_used: String,
    pub product_count: i64,
}

impl ProductionLogRequest {
    pub fn validate(self) -> Result<ProductionCommand, ServerError> {
        let resource_used = self
            .resource_used
            .map(Scalar::into_text)
            .filter(|r| !r.trim().is_empty());
        let (Some(task_id), Some(resource_used), Some(count)) =
            (self.task_id, resource_used, self.product_count)
        else {
            return Err(bad_request(
                "Missing task_id, resource_used, or product_count",
            ));
        };
        let invalid = || bad_request("Product count or task_id must be a valid integer");
        let task_id = task_id.as_int().ok_or_else(invalid)?;
        let product_count = count.as_int().filter(|c| *c >= 0).ok_or_else(invalid)?;
        Ok(ProductionCommand {
            task_id,
            resource_used,
            product_count,
        })
    }
}

fn bad_request(message: &str) -> ServerError {
    ServerError::BadRequest(message.to_string())
}
