// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outbox retention tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{EngineContext, eventually};
use hosting_engine::{
    EngineRuntime, OutboxStore, PruneReport, RetentionConfig, RetentionWorker,
};

fn retention(max_age: Duration) -> RetentionConfig {
    RetentionConfig {
        enabled: true,
        poll_interval: Duration::from_millis(20),
        max_age,
        batch_size: 2,
    }
}

fn worker(ctx: &EngineContext, max_age: Duration) -> RetentionWorker {
    RetentionWorker::new(ctx.outbox.clone() as Arc<dyn OutboxStore>, retention(max_age))
}

#[tokio::test]
async fn test_prunes_processed_rows_and_keeps_pending_work() {
    let ctx = EngineContext::new().await;
    ctx.handler.fail_on("b").await;
    for id in ["a", "b", "c"] {
        ctx.signal("t1", id).await;
    }
    ctx.worker("w1").tick().await.unwrap();
    ctx.signal("t2", "d").await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let report = worker(&ctx, Duration::ZERO).prune_once().await.unwrap();

    // Batches of two drain all three processed signals, failed included.
    assert_eq!(
        report,
        PruneReport {
            signals: 3,
            executions: 1
        }
    );
    assert!(ctx.outbox.get_execution("tenant-t1").await.unwrap().is_none());

    let running = ctx.outbox.get_execution("tenant-t2").await.unwrap().unwrap();
    assert_eq!(running.status, "running");
    assert_eq!(
        ctx.states("tenant-t2").await,
        vec![("d".to_string(), "pending".to_string())]
    );
}

#[tokio::test]
async fn test_recent_rows_are_kept() {
    let ctx = EngineContext::new().await;
    ctx.signal("t1", "a").await;
    ctx.worker("w1").tick().await.unwrap();

    let report = worker(&ctx, Duration::from_secs(3600))
        .prune_once()
        .await
        .unwrap();

    assert_eq!(report, PruneReport::default());
    assert_eq!(ctx.outbox.list_signals("tenant-t1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_closed_execution_with_pending_signal_is_kept() {
    let ctx = EngineContext::new().await;
    ctx.signal("t1", "a").await;
    ctx.worker("w1").tick().await.unwrap();

    // A signal committed behind the close, not yet picked up by reopen.
    sqlx::query(
        "INSERT INTO provision_signals \
         (execution_id, signal_name, workflow_name, workflow_id, resource_type, resource_id, arg, state, created_at) \
         VALUES ('tenant-t1', 'provision', 'CreateWebrootWorkflow', 'late', 'webroot', 'late', '{}', 'pending', $1)",
    )
    .bind(chrono::Utc::now())
    .execute(ctx.outbox.pool())
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let report = worker(&ctx, Duration::ZERO).prune_once().await.unwrap();
    assert_eq!(report.signals, 1);
    assert_eq!(report.executions, 0);
    assert_eq!(
        ctx.states("tenant-t1").await,
        vec![("late".to_string(), "pending".to_string())]
    );
}

#[tokio::test]
async fn test_pruned_execution_starts_again() {
    let ctx = EngineContext::new().await;
    ctx.signal("t1", "a").await;
    ctx.worker("w1").tick().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    worker(&ctx, Duration::ZERO).prune_once().await.unwrap();

    let outcome = ctx.signal("t1", "a").await;
    assert!(outcome.started);
    assert!(!outcome.deduplicated);

    ctx.worker("w1").tick().await.unwrap();
    assert_eq!(ctx.handler.workflow_ids().await, vec!["a", "a"]);
}

#[tokio::test]
async fn test_runtime_runs_retention() {
    let ctx = EngineContext::new().await;
    ctx.signal("t1", "a").await;

    let runtime = EngineRuntime::builder()
        .store(ctx.outbox.clone())
        .registry(ctx.registry())
        .worker_id("test")
        .workers(1)
        .poll_interval(Duration::from_millis(10))
        .retention(retention(Duration::ZERO))
        .build()
        .unwrap()
        .start();
    assert!(runtime.retention_enabled());

    let outbox = ctx.outbox.clone();
    let pruned = eventually(|| {
        let outbox = outbox.clone();
        async move { matches!(outbox.get_execution("tenant-t1").await, Ok(None)) }
    })
    .await;
    runtime.shutdown().await.unwrap();

    assert!(pruned, "closed execution was never pruned");
    assert_eq!(ctx.handler.workflow_ids().await, vec!["a"]);
}

#[tokio::test]
async fn test_disabled_retention_is_not_spawned() {
    let ctx = EngineContext::new().await;
    let runtime = EngineRuntime::builder()
        .store(ctx.outbox.clone())
        .retention(RetentionConfig {
            enabled: false,
            ..Default::default()
        })
        .build()
        .unwrap()
        .start();

    assert!(!runtime.retention_enabled());
    runtime.shutdown().await.unwrap();
}
