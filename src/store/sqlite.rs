//! SQLite implementation of [`ShopStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature. Migrations are embedded with
//! `sqlx::migrate!("./migrations")` (resolved relative to the crate root at
//! compile time) and run by [`SqliteStore::connect`].
//!
//! # Queries
//!
//! The runtime-checked `sqlx::query` form is used so that no `DATABASE_URL`
//! is needed at compile time. Timestamps are bound as RFC 3339 text with
//! second precision and a `Z` suffix, which keeps them fixed-width and
//! lexicographically ordered.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::warn;

use super::{
    MachineDeletion, NewTask, Placement, ScheduleRow, ShopStore, StoreError, StoreResult,
    TaskPatch,
};
use crate::models::{
    Machine, MachineId, PrecedenceEdge, ProductionLog, Task, TaskId, TaskStatus,
};

/// `(task_id, job_id, name, duration_hours, required_machine_id, status, start_time, end_time)`
type TaskRow = (i64, i64, String, f64, i64, String, Option<String>, Option<String>);

const TASK_COLUMNS: &str =
    "t.task_id, t.job_id, t.name, t.duration_hours, t.required_machine_id, t.status, t.start_time, t.end_time";

/// SQLite-backed shop-floor store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and runs pending migrations.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://shopfloor.db?mode=rwc"`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database, for tests and demos.
    ///
    /// Every SQLite memory connection is its own database, so the pool holds
    /// exactly one connection and never recycles it.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool and runs pending migrations on it.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(raw: Option<String>, task_id: TaskId) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(task_id, raw = %raw, error = %e, "unparseable task timestamp; treating as unset");
            None
        }
    }
}

fn row_to_task(row: TaskRow) -> Task {
    let (task_id, job_id, name, duration_hours, machine_id, status, start, end) = row;
    let status = status.parse().unwrap_or_else(|e| {
        warn!(task_id, error = %e, "unknown stored status; treating as Pending");
        TaskStatus::Pending
    });
    Task {
        task_id,
        job_id,
        name,
        duration_hours,
        required_machine_id: machine_id,
        status,
        start_time: parse_ts(start, task_id),
        end_time: parse_ts(end, task_id),
    }
}

impl ShopStore for SqliteStore {
    // ── machines ─────────────────────────────────────────────────────────────

    async fn list_machines(&self) -> StoreResult<Vec<Machine>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT machine_id, name, capacity FROM machines ORDER BY machine_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(machine_id, name, capacity)| Machine {
                machine_id,
                name,
                capacity,
            })
            .collect())
    }

    async fn find_machine_by_name(&self, name: &str) -> StoreResult<Option<Machine>> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT machine_id, name, capacity FROM machines WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(machine_id, name, capacity)| Machine {
            machine_id,
            name,
            capacity,
        }))
    }

    async fn insert_machine(&self, name: &str, capacity: i64) -> StoreResult<MachineId> {
        let result = sqlx::query("INSERT INTO machines (name, capacity) VALUES (?1, ?2)")
            .bind(name)
            .bind(capacity)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn delete_machine(&self, machine_id: MachineId) -> StoreResult<MachineDeletion> {
        let mut tx = self.pool.begin().await?;

        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE required_machine_id = ?1")
                .bind(machine_id)
                .fetch_one(&mut *tx)
                .await?;
        if referenced > 0 {
            return Ok(MachineDeletion::Referenced(referenced));
        }

        let result = sqlx::query("DELETE FROM machines WHERE machine_id = ?1")
            .bind(machine_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(MachineDeletion::NotFound);
        }

        tx.commit().await?;
        Ok(MachineDeletion::Deleted)
    }

    // ── tasks ────────────────────────────────────────────────────────────────

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks t ORDER BY t.task_id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(row_to_task).collect())
    }

    async fn list_schedule(&self) -> StoreResult<Vec<ScheduleRow>> {
        let rows: Vec<(i64, i64, String, f64, i64, String, Option<String>, Option<String>, String)> =
            sqlx::query_as(&format!(
                "SELECT {TASK_COLUMNS}, m.name \
                 FROM tasks t JOIN machines m ON t.required_machine_id = m.machine_id \
                 ORDER BY t.task_id"
            ))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, job, name, hours, machine, status, start, end, machine_name)| ScheduleRow {
                task: row_to_task((id, job, name, hours, machine, status, start, end)),
                machine_name,
            })
            .collect())
    }

    async fn get_task(&self, task_id: TaskId) -> StoreResult<Option<Task>> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.task_id = ?1"))
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_task))
    }

    async fn insert_task<F>(&self, task: NewTask, place: F) -> StoreResult<Task>
    where
        F: FnOnce(Option<DateTime<Utc>>) -> (DateTime<Utc>, DateTime<Utc>) + Send,
    {
        let mut tx = self.pool.begin().await?;

        let job_id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(job_id), 0) + 1 FROM tasks")
            .fetch_one(&mut *tx)
            .await?;

        let ends: Vec<(i64, String)> = sqlx::query_as(
            "SELECT task_id, end_time FROM tasks \
             WHERE required_machine_id = ?1 AND end_time IS NOT NULL",
        )
        .bind(task.machine_id)
        .fetch_all(&mut *tx)
        .await?;
        let latest_end = ends
            .into_iter()
            .filter_map(|(id, end)| parse_ts(Some(end), id))
            .max();

        let (start, end) = place(latest_end);
        let result = sqlx::query(
            "INSERT INTO tasks \
             (job_id, name, duration_hours, required_machine_id, status, start_time, end_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(job_id)
        .bind(&task.name)
        .bind(task.duration_hours)
        .bind(task.machine_id)
        .bind(TaskStatus::Pending.as_str())
        .bind(format_ts(&start))
        .bind(format_ts(&end))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Task {
            task_id: result.last_insert_rowid(),
            job_id,
            name: task.name,
            duration_hours: task.duration_hours,
            required_machine_id: task.machine_id,
            status: TaskStatus::Pending,
            start_time: Some(start),
            end_time: Some(end),
        })
    }

    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET \
                 name = COALESCE(?1, name), \
                 duration_hours = COALESCE(?2, duration_hours), \
                 required_machine_id = COALESCE(?3, required_machine_id), \
                 status = ?4, start_time = NULL, end_time = NULL \
             WHERE task_id = ?5",
        )
        .bind(patch.name)
        .bind(patch.duration_hours)
        .bind(patch.machine_id)
        .bind(TaskStatus::Pending.as_str())
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        clear_times: bool,
    ) -> StoreResult<bool> {
        let sql = if clear_times {
            "UPDATE tasks SET status = ?1, start_time = NULL, end_time = NULL WHERE task_id = ?2"
        } else {
            "UPDATE tasks SET status = ?1 WHERE task_id = ?2"
        };
        let result = sqlx::query(sql)
            .bind(status.as_str())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, task_id: TaskId) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM production_logs WHERE task_id = ?1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "DELETE FROM precedences WHERE predecessor_task_id = ?1 OR successor_task_id = ?1",
        )
        .bind(task_id)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM tasks WHERE task_id = ?1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn apply_schedule(&self, placements: &[Placement]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for placement in placements {
            let result = sqlx::query(
                "UPDATE tasks SET start_time = ?1, end_time = ?2, status = ?3 WHERE task_id = ?4",
            )
            .bind(format_ts(&placement.start))
            .bind(format_ts(&placement.end))
            .bind(TaskStatus::Scheduled.as_str())
            .bind(placement.task_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                // Dropping `tx` rolls back every update made so far.
                return Err(StoreError::MissingRow {
                    table: "tasks",
                    id: placement.task_id,
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    // ── precedences ──────────────────────────────────────────────────────────

    async fn list_precedences(&self) -> StoreResult<Vec<PrecedenceEdge>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT predecessor_task_id, successor_task_id FROM precedences \
             ORDER BY predecessor_task_id, successor_task_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(pred, succ)| PrecedenceEdge::new(pred, succ))
            .collect())
    }

    async fn insert_precedence(&self, edge: PrecedenceEdge) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO precedences (predecessor_task_id, successor_task_id) \
             VALUES (?1, ?2)",
        )
        .bind(edge.predecessor_task_id)
        .bind(edge.successor_task_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_precedence(&self, edge: PrecedenceEdge) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM precedences WHERE predecessor_task_id = ?1 AND successor_task_id = ?2",
        )
        .bind(edge.predecessor_task_id)
        .bind(edge.successor_task_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── production logs ──────────────────────────────────────────────────────

    async fn insert_production_log(
        &self,
        task_id: TaskId,
        resource_used: &str,
        product_count: i64,
    ) -> StoreResult<ProductionLog> {
        let logged_at = Utc::now().trunc_subsecs(0);
        let result = sqlx::query(
            "INSERT INTO production_logs (task_id, resource_used, product_count, logged_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(task_id)
        .bind(resource_used)
        .bind(product_count)
        .bind(format_ts(&logged_at))
        .execute(&self.pool)
        .await?;
        Ok(ProductionLog {
            log_id: result.last_insert_rowid(),
            task_id,
            resource_used: resource_used.to_owned(),
            product_count,
            logged_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, h, m, 0).unwrap()
    }

    async fn seeded() -> (SqliteStore, MachineId) {
        let store = SqliteStore::in_memory().await.unwrap();
        let machine = store.insert_machine("Lathe", 1).await.unwrap();
        (store, machine)
    }

    fn new_task(name: &str, machine_id: MachineId) -> NewTask {
        NewTask {
            name: name.into(),
            duration_hours: 1.0,
            machine_id,
        }
    }

    #[tokio::test]
    async fn test_machine_crud() {
        let (store, lathe) = seeded().await;
        let oven = store.insert_machine("Oven", 3).await.unwrap();

        let machines = store.list_machines().await.unwrap();
        assert_eq!(machines.len(), 2);
        assert_eq!(machines[1].capacity, 3);
        assert_eq!(store.find_machine_by_name("Lathe").await.unwrap().unwrap().machine_id, lathe);

        let dup = store.insert_machine("Oven", 1).await.unwrap_err();
        assert!(dup.is_unique_violation());

        assert_eq!(store.delete_machine(oven).await.unwrap(), MachineDeletion::Deleted);
        assert_eq!(store.delete_machine(oven).await.unwrap(), MachineDeletion::NotFound);
    }

    #[tokio::test]
    async fn test_referenced_machine_is_kept() {
        let (store, lathe) = seeded().await;
        store
            .insert_task(new_task("Turn", lathe), |_| (at(8, 0), at(9, 0)))
            .await
            .unwrap();

        assert_eq!(store.delete_machine(lathe).await.unwrap(), MachineDeletion::Referenced(1));
        assert_eq!(store.list_machines().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_task_sees_latest_end() {
        let (store, lathe) = seeded().await;
        let first = store
            .insert_task(new_task("A", lathe), |latest| {
                assert_eq!(latest, None);
                (at(8, 0), at(9, 0))
            })
            .await
            .unwrap();
        assert_eq!(first.job_id, 1);

        let second = store
            .insert_task(new_task("B", lathe), |latest| {
                assert_eq!(latest, Some(at(9, 0)));
                (at(9, 0), at(10, 0))
            })
            .await
            .unwrap();
        assert_eq!(second.job_id, 2);
        assert_eq!(second.status, TaskStatus::Pending);

        let stored = store.get_task(second.task_id).await.unwrap().unwrap();
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn test_update_resets_to_pending() {
        let (store, lathe) = seeded().await;
        let task = store
            .insert_task(new_task("A", lathe), |_| (at(8, 0), at(9, 0)))
            .await
            .unwrap();

        let patch = TaskPatch {
            duration_hours: Some(2.5),
            ..TaskPatch::default()
        };
        assert!(store.update_task(task.task_id, patch.clone()).await.unwrap());
        let updated = store.get_task(task.task_id).await.unwrap().unwrap();
        assert_eq!(updated.name, "A");
        assert_eq!(updated.duration_hours, 2.5);
        assert_eq!(updated.start_time, None);
        assert_eq!(updated.end_time, None);

        assert!(!store.update_task(999, patch).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_task_cascades() {
        let (store, lathe) = seeded().await;
        let a = store.insert_task(new_task("A", lathe), |_| (at(8, 0), at(9, 0))).await.unwrap();
        let b = store.insert_task(new_task("B", lathe), |_| (at(9, 0), at(10, 0))).await.unwrap();
        store.insert_precedence(PrecedenceEdge::new(a.task_id, b.task_id)).await.unwrap();
        store.insert_production_log(a.task_id, "steel", 4).await.unwrap();

        assert!(store.delete_task(a.task_id).await.unwrap());
        assert!(store.list_precedences().await.unwrap().is_empty());
        assert!(!store.delete_task(a.task_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_schedule_is_atomic() {
        let (store, lathe) = seeded().await;
        let a = store.insert_task(new_task("A", lathe), |_| (at(8, 0), at(9, 0))).await.unwrap();

        let placements = [
            Placement {
                task_id: a.task_id,
                start: at(12, 0),
                end: at(13, 0),
            },
            Placement {
                task_id: 404,
                start: at(13, 0),
                end: at(14, 0),
            },
        ];
        let err = store.apply_schedule(&placements).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { id: 404, .. }));

        let unchanged = store.get_task(a.task_id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TaskStatus::Pending);
        assert_eq!(unchanged.start_time, Some(at(8, 0)));

        store.apply_schedule(&placements[..1]).await.unwrap();
        let scheduled = store.get_task(a.task_id).await.unwrap().unwrap();
        assert_eq!(scheduled.status, TaskStatus::Scheduled);
        assert_eq!(scheduled.span(), Some((at(12, 0), at(13, 0))));
    }

    #[tokio::test]
    async fn test_precedence_roundtrip() {
        let (store, lathe) = seeded().await;
        let a = store.insert_task(new_task("A", lathe), |_| (at(8, 0), at(9, 0))).await.unwrap();
        let b = store.insert_task(new_task("B", lathe), |_| (at(9, 0), at(10, 0))).await.unwrap();
        let edge = PrecedenceEdge::new(a.task_id, b.task_id);

        assert!(store.insert_precedence(edge).await.unwrap());
        assert!(!store.insert_precedence(edge).await.unwrap());
        assert_eq!(store.list_precedences().await.unwrap(), vec![edge]);
        assert!(store.delete_precedence(edge).await.unwrap());
        assert!(!store.delete_precedence(edge).await.unwrap());
    }

    #[tokio::test]
    async fn test_schedule_listing_joins_machine_name() {
        let (store, lathe) = seeded().await;
        store.insert_task(new_task("A", lathe), |_| (at(8, 0), at(9, 0))).await.unwrap();

        let rows = store.list_schedule().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].machine_name, "Lathe");
        assert_eq!(rows[0].task.start_time, Some(at(8, 0)));
    }
}
