//! Shop-floor scheduling engine.
//!
//! Assigns manufacturing tasks to machines over time, respecting
//! finish-to-start precedences and per-machine capacity, and minimizes the
//! makespan of the pending backlog.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `Machine`, `PrecedenceEdge`,
//!   `ProductionLog`, `Schedule`
//! - **`cp`**: CP formulation (`ScheduleCpBuilder`), the optimization
//!   capability trait (`CpSolver`) and an exact branch-and-bound solver
//! - **`engine`**: `SchedulingEngine`: problem assembly, sequential estimation,
//!   optimization and materialization behind a single-flight guard
//! - **`store`**: Persistence trait (`ShopStore`) and its SQLite implementation
//! - **`api`**: Axum router for the HTTP/JSON surface
//! - **`validation`**: Input integrity checks and infeasibility diagnosis
//! - **`config`** / **`logging`**: Environment configuration and tracing setup
//!
//! # Example
//!
//! ```no_run
//! use shopfloor_scheduler::config::EngineConfig;
//! use shopfloor_scheduler::engine::{OptimizeReport, SchedulingEngine};
//! use shopfloor_scheduler::store::SqliteStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::in_memory().await?;
//! let engine = SchedulingEngine::new(store, EngineConfig::default());
//!
//! engine.add_machine("Lathe", 1).await?;
//! engine.create_task("Turn shaft", 2.0, "Lathe").await?;
//! if let OptimizeReport::Scheduled(summary) = engine.optimize(None).await? {
//!     println!("makespan: {} min", summary.makespan_minutes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Brucker (2007), "Scheduling Algorithms"
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

pub mod api;
pub mod config;
pub mod cp;
pub mod engine;
pub mod logging;
pub mod models;
pub mod store;
pub mod validation;
