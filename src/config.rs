//! Configuration, loaded from environment variables at startup.
//!
//! Library users configure the engine directly through [`EngineConfig`];
//! the server binary reads everything with [`Config::from_env`].

use std::time::Duration;

use crate::cp::SolverConfig;

/// Runtime configuration for the server.
///
/// Every field has a default so the server starts without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://shopfloor.db?mode=rwc"`).
    pub database_url: String,

    /// Connection pool size (default: 5).
    pub db_max_connections: u32,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Engine settings.
    pub engine: EngineConfig,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let time_limit_ms = parse_env(
            "SHOPFLOOR_SOLVE_TIME_LIMIT_MS",
            duration_ms(defaults.solve_time_limit),
        );
        Self {
            bind_address: env_or("SHOPFLOOR_BIND", "0.0.0.0:5000"),
            database_url: env_or("SHOPFLOOR_DATABASE_URL", "sqlite://shopfloor.db?mode=rwc"),
            db_max_connections: parse_env("SHOPFLOOR_DB_MAX_CONNECTIONS", 5),
            log_level: env_or("SHOPFLOOR_LOG", "info"),
            log_json: flag_env("SHOPFLOOR_LOG_JSON", false),
            engine: EngineConfig {
                horizon_minutes: parse_env("SHOPFLOOR_HORIZON_MINUTES", defaults.horizon_minutes),
                // 0 disables the limit.
                solve_time_limit: (time_limit_ms > 0).then(|| Duration::from_millis(time_limit_ms)),
                solver_seed: parse_env("SHOPFLOOR_SOLVER_SEED", defaults.solver_seed),
                respect_committed: flag_env("SHOPFLOOR_RESPECT_COMMITTED", defaults.respect_committed),
            },
        }
    }
}

/// Scheduling engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound for every interval, in minutes from the anchor.
    pub horizon_minutes: i64,
    /// Wall-clock bound for one solve. `None` searches to optimality.
    pub solve_time_limit: Option<Duration>,
    /// Seed for the solver's randomized restarts.
    pub solver_seed: u64,
    /// Model already-Scheduled work as fixed occupancy.
    pub respect_committed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: 100_000,
            solve_time_limit: Some(Duration::from_secs(10)),
            solver_seed: 42,
            respect_committed: true,
        }
    }
}

impl EngineConfig {
    /// Sets the horizon (minutes).
    pub fn with_horizon_minutes(mut self, minutes: i64) -> Self {
        self.horizon_minutes = minutes;
        self
    }

    /// Sets the solve time limit.
    pub fn with_solve_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.solve_time_limit = limit;
        self
    }

    /// Sets the solver seed.
    pub fn with_solver_seed(mut self, seed: u64) -> Self {
        self.solver_seed = seed;
        self
    }

    /// Sets whether committed work is modeled as fixed occupancy.
    pub fn with_respect_committed(mut self, respect: bool) -> Self {
        self.respect_committed = respect;
        self
    }

    /// Solver parameters derived from these settings.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig::default()
            .with_time_limit(self.solve_time_limit)
            .with_seed(self.solver_seed)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn flag_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn duration_ms(limit: Option<Duration>) -> u64 {
    limit.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
