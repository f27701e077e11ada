//! End-to-end engine tests against an in-memory SQLite store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use shopfloor_scheduler::config::EngineConfig;
use shopfloor_scheduler::cp::{BranchAndBoundSolver, CpModel, CpSolution, CpSolver, SolverConfig};
use shopfloor_scheduler::engine::{EngineError, OptimizeReport, SchedulingEngine, TaskUpdate};
use shopfloor_scheduler::models::{PrecedenceEdge, Task, TaskStatus};
use shopfloor_scheduler::store::{Placement, ShopStore, SqliteStore};

const ANCHOR: &str = "2025-03-03T08:00:00";

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
}

async fn engine() -> SchedulingEngine<SqliteStore> {
    let store = SqliteStore::in_memory().await.unwrap();
    SchedulingEngine::new(store, EngineConfig::default())
}

async fn task(engine: &SchedulingEngine<SqliteStore>, id: i64) -> Task {
    engine.store().get_task(id).await.unwrap().unwrap()
}

fn scheduled(report: OptimizeReport) -> shopfloor_scheduler::engine::OptimizeSummary {
    match report {
        OptimizeReport::Scheduled(summary) => summary,
        OptimizeReport::NoBacklog => panic!("expected a schedule"),
    }
}

#[tokio::test]
async fn test_estimator_appends_after_latest_end() {
    let engine = engine().await;
    engine.add_machine("Lathe", 1).await.unwrap();
    let first = engine.create_task("Rough", 1.5, "Lathe").await.unwrap();
    let (_, first_end) = first.span().unwrap();

    let second = engine.create_task("Finish", 2.0, "Lathe").await.unwrap();
    let (start, end) = second.span().unwrap();
    assert_eq!(start, first_end);
    assert_eq!(end - start, chrono::Duration::hours(2));
    assert_eq!(second.status, TaskStatus::Pending);
    assert_eq!(second.job_id, first.job_id + 1);
}

#[tokio::test]
async fn test_empty_backlog_changes_nothing() {
    let engine = engine().await;
    assert_eq!(engine.optimize(Some(ANCHOR)).await.unwrap(), OptimizeReport::NoBacklog);

    engine.add_machine("Lathe", 1).await.unwrap();
    let t = engine.create_task("Cut", 1.0, "Lathe").await.unwrap();
    engine.store().apply_schedule(&[Placement {
        task_id: t.task_id,
        start: anchor(),
        end: anchor() + chrono::Duration::hours(1),
    }])
    .await
    .unwrap();
    engine.set_status(t.task_id, "Completed").await.unwrap();

    let before = engine.schedule_view().await.unwrap();
    assert_eq!(engine.optimize(Some(ANCHOR)).await.unwrap(), OptimizeReport::NoBacklog);
    assert_eq!(engine.schedule_view().await.unwrap(), before);
}

#[tokio::test]
async fn test_optimize_respects_precedence_and_exclusivity() {
    let engine = engine().await;
    engine.add_machine("Lathe", 1).await.unwrap();
    engine.add_machine("Mill", 1).await.unwrap();
    let a = engine.create_task("A", 1.0, "Lathe").await.unwrap().task_id;
    let b = engine.create_task("B", 0.5, "Mill").await.unwrap().task_id;
    let c = engine.create_task("C", 1.0, "Lathe").await.unwrap().task_id;
    engine.add_precedence(PrecedenceEdge::new(b, a)).await.unwrap();

    let summary = scheduled(engine.optimize(Some(ANCHOR)).await.unwrap());
    assert_eq!(summary.status, "OPTIMAL");
    assert_eq!(summary.scheduled_tasks, 3);
    // C runs first on the lathe while B runs on the mill; A follows both.
    assert_eq!(summary.makespan_minutes, 120);
    assert_eq!(summary.anchor, anchor());

    let (a, b, c) = (task(&engine, a).await, task(&engine, b).await, task(&engine, c).await);
    for t in [&a, &b, &c] {
        assert_eq!(t.status, TaskStatus::Scheduled);
        let (start, end) = t.span().unwrap();
        assert_eq!((end - start).num_minutes(), t.duration_minutes());
        assert!(start >= anchor());
    }
    assert!(a.start_time.unwrap() >= b.end_time.unwrap());
    let lathe_overlap =
        a.start_time.unwrap() < c.end_time.unwrap() && c.start_time.unwrap() < a.end_time.unwrap();
    assert!(!lathe_overlap);
}

#[tokio::test]
async fn test_cycle_is_infeasible_and_writes_nothing() {
    let engine = engine().await;
    engine.add_machine("Lathe", 1).await.unwrap();
    let a = engine.create_task("A", 1.0, "Lathe").await.unwrap().task_id;
    let b = engine.create_task("B", 1.0, "Lathe").await.unwrap().task_id;
    engine.add_precedence(PrecedenceEdge::new(a, b)).await.unwrap();
    engine.add_precedence(PrecedenceEdge::new(b, a)).await.unwrap();

    let before = engine.schedule_view().await.unwrap();
    match engine.optimize(Some(ANCHOR)).await {
        Err(EngineError::Infeasible { message }) => {
            assert!(message.contains("cycle"), "{message}");
        }
        other => panic!("expected infeasible, got {other:?}"),
    }
    assert_eq!(engine.schedule_view().await.unwrap(), before);
}

#[tokio::test]
async fn test_task_beyond_horizon_is_infeasible() {
    let store = SqliteStore::in_memory().await.unwrap();
    let engine =
        SchedulingEngine::new(store, EngineConfig::default().with_horizon_minutes(600));
    engine.add_machine("Kiln", 1).await.unwrap();
    engine.create_task("Fire", 12.0, "Kiln").await.unwrap();

    match engine.optimize(Some(ANCHOR)).await {
        Err(EngineError::Infeasible { message }) => assert!(message.contains("horizon")),
        other => panic!("expected infeasible, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_referenced_machine_conflicts() {
    let engine = engine().await;
    let lathe = engine.add_machine("Lathe", 1).await.unwrap();
    let t = engine.create_task("Cut", 1.0, "Lathe").await.unwrap();

    let machines = engine.list_machines().await.unwrap();
    assert!(matches!(
        engine.delete_machine(lathe).await,
        Err(EngineError::Conflict(_))
    ));
    assert_eq!(engine.list_machines().await.unwrap(), machines);
    assert_eq!(task(&engine, t.task_id).await, t);

    engine.delete_task(t.task_id).await.unwrap();
    engine.delete_machine(lathe).await.unwrap();
    assert!(engine.list_machines().await.unwrap().is_empty());
    assert!(matches!(
        engine.delete_machine(lathe).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_committed_work_is_never_overlapped() {
    let engine = engine().await;
    engine.add_machine("Lathe", 1).await.unwrap();
    let running = engine.create_task("Running", 2.0, "Lathe").await.unwrap().task_id;
    engine.store().apply_schedule(&[Placement {
        task_id: running,
        start: anchor() - chrono::Duration::minutes(30),
        end: anchor() + chrono::Duration::minutes(90),
    }])
    .await
    .unwrap();

    let next = engine.create_task("Next", 1.0, "Lathe").await.unwrap().task_id;
    let summary = scheduled(engine.optimize(Some(ANCHOR)).await.unwrap());
    assert_eq!(summary.scheduled_tasks, 1);
    assert_eq!(summary.makespan_minutes, 150);

    let next = task(&engine, next).await;
    assert_eq!(next.start_time, Some(anchor() + chrono::Duration::minutes(90)));
    // The committed task keeps its original placement.
    let running = task(&engine, running).await;
    assert_eq!(running.start_time, Some(anchor() - chrono::Duration::minutes(30)));
}

#[tokio::test]
async fn test_literal_mode_ignores_committed_work() {
    let store = SqliteStore::in_memory().await.unwrap();
    let engine =
        SchedulingEngine::new(store, EngineConfig::default().with_respect_committed(false));
    engine.add_machine("Lathe", 1).await.unwrap();
    let running = engine.create_task("Running", 2.0, "Lathe").await.unwrap().task_id;
    engine.store().apply_schedule(&[Placement {
        task_id: running,
        start: anchor(),
        end: anchor() + chrono::Duration::hours(2),
    }])
    .await
    .unwrap();
    let next = engine.create_task("Next", 1.0, "Lathe").await.unwrap().task_id;

    scheduled(engine.optimize(Some(ANCHOR)).await.unwrap());
    assert_eq!(task(&engine, next).await.start_time, Some(anchor()));
}

#[tokio::test]
async fn test_parallel_machine_runs_up_to_capacity() {
    let engine = engine().await;
    engine.add_machine("Oven", 2).await.unwrap();
    for name in ["A", "B", "C"] {
        engine.create_task(name, 1.0, "Oven").await.unwrap();
    }
    let summary = scheduled(engine.optimize(Some(ANCHOR)).await.unwrap());
    assert_eq!(summary.makespan_minutes, 120);
}

#[tokio::test]
async fn test_update_returns_task_to_backlog() {
    let engine = engine().await;
    engine.add_machine("Lathe", 1).await.unwrap();
    engine.add_machine("Mill", 1).await.unwrap();
    let id = engine.create_task("Cut", 1.0, "Lathe").await.unwrap().task_id;
    scheduled(engine.optimize(Some(ANCHOR)).await.unwrap());
    assert_eq!(task(&engine, id).await.status, TaskStatus::Scheduled);

    engine
        .update_task(
            id,
            TaskUpdate {
                duration_hours: Some(3.0),
                machine_name: Some("Mill".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let edited = task(&engine, id).await;
    assert_eq!(edited.status, TaskStatus::Pending);
    assert_eq!(edited.span(), None);
    assert_eq!(edited.duration_hours, 3.0);

    let summary = scheduled(engine.optimize(Some(ANCHOR)).await.unwrap());
    assert_eq!(summary.makespan_minutes, 180);
}

#[tokio::test]
async fn test_delete_task_cascades_edges() {
    let engine = engine().await;
    engine.add_machine("Lathe", 1).await.unwrap();
    let a = engine.create_task("A", 1.0, "Lathe").await.unwrap().task_id;
    let b = engine.create_task("B", 1.0, "Lathe").await.unwrap().task_id;
    engine.add_precedence(PrecedenceEdge::new(a, b)).await.unwrap();
    engine.log_production(a, "steel", 4).await.unwrap();

    engine.delete_task(a).await.unwrap();
    assert!(engine.list_precedences().await.unwrap().is_empty());
    assert!(matches!(
        engine.delete_task(a).await,
        Err(EngineError::NotFound(_))
    ));
}

/// Blocks long enough for a second caller to find the guard taken.
struct SlowSolver;

impl CpSolver for SlowSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        std::thread::sleep(Duration::from_millis(400));
        BranchAndBoundSolver::new().solve(model, config)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_optimize_is_busy() {
    let store = SqliteStore::in_memory().await.unwrap();
    let engine = Arc::new(SchedulingEngine::with_solver(
        store,
        EngineConfig::default(),
        Arc::new(SlowSolver),
    ));
    engine.add_machine("Lathe", 1).await.unwrap();
    engine.create_task("Cut", 1.0, "Lathe").await.unwrap();

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.optimize(Some(ANCHOR)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(matches!(
        engine.optimize(Some(ANCHOR)).await,
        Err(EngineError::Busy)
    ));
    let summary = scheduled(first.await.unwrap().unwrap());
    assert_eq!(summary.scheduled_tasks, 1);
}
