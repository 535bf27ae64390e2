// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cron failure threshold tests.

mod common;

use std::sync::Arc;

use common::TestContext;
use futures::future::join_all;
use hosting_core::CoreError;
use hosting_core::engine::EngineError;
use hosting_core::lifecycle::ProvisionOutcome;
use hosting_core::model::{CronJobRecord, ResourceKind, ResourceStatus, ShardRole};

async fn setup(max_failures: i32) -> (TestContext, CronJobRecord) {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("web-1", ShardRole::Web).await;
    let tenant = ctx.active_tenant("acme", &shard).await;
    let webroot = ctx.active_webroot(&tenant, "main").await;
    let job = ctx.active_cron_job(&webroot, "nightly", max_failures).await;
    (ctx, job)
}

async fn disable_dispatches(ctx: &TestContext) -> usize {
    ctx.engine
        .workflow_names()
        .await
        .iter()
        .filter(|name| *name == "DisableCronJobWorkflow")
        .count()
}

#[tokio::test]
async fn test_success_resets_counter() {
    let (ctx, job) = setup(10).await;
    let monitor = &ctx.services.cron_monitor;

    for _ in 0..4 {
        monitor.report_cron_outcome(&job.id, false).await.unwrap();
    }
    assert_eq!(
        ctx.services.cron_jobs.get(&job.id).await.unwrap().consecutive_failures,
        4
    );

    monitor.report_cron_outcome(&job.id, true).await.unwrap();
    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.consecutive_failures, 0);
    assert_eq!(stored.status, ResourceStatus::Active);
}

#[tokio::test]
async fn test_threshold_auto_disables_exactly_once() {
    let (ctx, job) = setup(3).await;
    let monitor = &ctx.services.cron_monitor;

    for _ in 0..2 {
        monitor.report_cron_outcome(&job.id, false).await.unwrap();
    }
    assert_eq!(disable_dispatches(&ctx).await, 0);

    monitor.report_cron_outcome(&job.id, false).await.unwrap();
    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.status, ResourceStatus::AutoDisabled);
    assert!(!stored.enabled);
    assert_eq!(
        stored.status_message.as_deref(),
        Some("auto-disabled after 3 consecutive failures")
    );
    assert_eq!(disable_dispatches(&ctx).await, 1);

    // Further failures count but do not fire again.
    monitor.report_cron_outcome(&job.id, false).await.unwrap();
    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.consecutive_failures, 4);
    assert_eq!(disable_dispatches(&ctx).await, 1);
}

#[tokio::test]
async fn test_zero_max_failures_never_disables() {
    let (ctx, job) = setup(0).await;

    for _ in 0..20 {
        ctx.services
            .cron_monitor
            .report_cron_outcome(&job.id, false)
            .await
            .unwrap();
    }

    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert!(stored.enabled);
    assert_eq!(stored.status, ResourceStatus::Active);
    assert_eq!(disable_dispatches(&ctx).await, 0);
}

#[tokio::test]
async fn test_dispatch_error_is_swallowed() {
    let (ctx, job) = setup(1).await;
    ctx.engine
        .set_failure(Some(EngineError::Unavailable("engine down".into())))
        .await;

    ctx.services
        .cron_monitor
        .report_cron_outcome(&job.id, false)
        .await
        .unwrap();

    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.status, ResourceStatus::AutoDisabled);
    // The rejected call was still attempted.
    assert_eq!(disable_dispatches(&ctx).await, 1);
}

#[tokio::test]
async fn test_unknown_cron_job_is_not_found() {
    let ctx = TestContext::new().await;
    let monitor = &ctx.services.cron_monitor;

    for success in [true, false] {
        let err = monitor
            .report_cron_outcome("missing", success)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }), "{:?}", err);
    }
}

#[tokio::test]
async fn test_concurrent_failures_disable_once() {
    let (ctx, job) = setup(2).await;
    let monitor = Arc::new(ctx.services.cron_monitor.clone());

    let reports = (0..6).map(|_| {
        let monitor = monitor.clone();
        let id = job.id.clone();
        async move { monitor.report_cron_outcome(&id, false).await }
    });
    for result in join_all(reports).await {
        result.unwrap();
    }

    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.consecutive_failures, 6);
    assert_eq!(stored.status, ResourceStatus::AutoDisabled);
    assert_eq!(disable_dispatches(&ctx).await, 1);
}

#[tokio::test]
async fn test_enable_after_auto_disable_resets_counter() {
    let (ctx, job) = setup(1).await;
    ctx.services
        .cron_monitor
        .report_cron_outcome(&job.id, false)
        .await
        .unwrap();

    ctx.services.cron_jobs.enable(&job.id).await.unwrap();

    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert!(stored.enabled);
    assert_eq!(stored.consecutive_failures, 0);
    assert_eq!(stored.status, ResourceStatus::Provisioning);
}

#[tokio::test]
async fn test_failures_during_deletion_do_not_auto_disable() {
    let (ctx, job) = setup(1).await;
    ctx.services.cron_jobs.delete(&job.id).await.unwrap();

    for _ in 0..3 {
        ctx.services
            .cron_monitor
            .report_cron_outcome(&job.id, false)
            .await
            .unwrap();
    }

    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.status, ResourceStatus::Deleting);
    assert_eq!(stored.consecutive_failures, 3);
    assert_eq!(disable_dispatches(&ctx).await, 0);

    // The delete workflow can still finish.
    ctx.services
        .lifecycle
        .report_outcome(ResourceKind::CronJob, &job.id, ProvisionOutcome::Deleted)
        .await
        .unwrap();
    let err = ctx.services.cron_jobs.get(&job.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_failures_before_convergence_do_not_auto_disable() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("web-1", ShardRole::Web).await;
    let tenant = ctx.active_tenant("acme", &shard).await;
    let webroot = ctx.active_webroot(&tenant, "main").await;
    let job = ctx.cron_job(&webroot, "nightly", 1).await;
    let status = job.status;
    assert_ne!(status, ResourceStatus::Active);

    ctx.services
        .cron_monitor
        .report_cron_outcome(&job.id, false)
        .await
        .unwrap();

    let stored = ctx.services.cron_jobs.get(&job.id).await.unwrap();
    assert_eq!(stored.status, status);
    assert!(stored.enabled);
    assert_eq!(stored.consecutive_failures, 1);
    assert_eq!(disable_dispatches(&ctx).await, 0);
}
