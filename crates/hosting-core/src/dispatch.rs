// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-tenant provisioning dispatch.
//!
//! Every task for a tenant is a signal into that tenant's single entity
//! execution (`tenant-{tenant_id}`), so a tenant's tasks run one at a time in
//! delivery order. Dispatch is fire-and-forget: it returns once the engine
//! has accepted the signal and never waits for the work.
//!
//! Delivery is at-least-once. A caller may deliver the same task twice; the
//! deterministic workflow ID makes the duplicate a no-op in the engine.
//! A dispatch failure is returned to the caller, but store writes made
//! before the dispatch are not rolled back. `Retry` is the recovery path.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{StartOptions, WorkflowEngine};
use crate::error::{CoreError, Result};
use crate::model::ProvisionTask;

/// Execution ID of a tenant's entity workflow.
pub fn entity_execution_id(tenant_id: &str) -> String {
    format!("tenant-{}", tenant_id)
}

/// Routes provision tasks into the workflow engine.
#[derive(Clone)]
pub struct ProvisionDispatcher {
    engine: Arc<dyn WorkflowEngine>,
    config: Config,
}

impl ProvisionDispatcher {
    pub fn new(engine: Arc<dyn WorkflowEngine>, config: Config) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signal `task` into the tenant's entity execution, starting it if needed.
    pub async fn dispatch(&self, tenant_id: &str, task: ProvisionTask) -> Result<()> {
        if tenant_id.is_empty() {
            return Err(CoreError::validation(
                "tenant_id",
                format!(
                    "tenant ID is required to dispatch {}",
                    task.workflow_id
                ),
            ));
        }

        let start = StartOptions {
            execution_id: entity_execution_id(tenant_id),
            workflow_type: self.config.entity_workflow.clone(),
            task_queue: self.config.task_queue.clone(),
            tenant_id: Some(tenant_id.to_string()),
        };

        let outcome = self
            .engine
            .signal_with_start(&start, &self.config.provision_signal, &task)
            .await
            .map_err(|e| {
                warn!(
                    tenant_id = %tenant_id,
                    workflow_id = %task.workflow_id,
                    engine = self.engine.engine_type(),
                    error = %e,
                    "Provision dispatch failed"
                );
                CoreError::Dispatch {
                    workflow_id: task.workflow_id.clone(),
                    reason: e.to_string(),
                }
            })?;

        if outcome.deduplicated {
            debug!(
                tenant_id = %tenant_id,
                workflow_id = %task.workflow_id,
                "Task already pending, duplicate ignored by engine"
            );
        }

        info!(
            tenant_id = %tenant_id,
            execution_id = %start.execution_id,
            workflow = %task.workflow_name,
            workflow_id = %task.workflow_id,
            started = outcome.started,
            "Provision task dispatched"
        );
        Ok(())
    }

    /// Start `task` directly. Used for resources that belong to no tenant.
    pub async fn dispatch_unscoped(&self, task: ProvisionTask) -> Result<()> {
        let outcome = self
            .engine
            .start_workflow(&self.config.task_queue, &task)
            .await
            .map_err(|e| {
                warn!(
                    workflow_id = %task.workflow_id,
                    engine = self.engine.engine_type(),
                    error = %e,
                    "Unscoped workflow start failed"
                );
                CoreError::Dispatch {
                    workflow_id: task.workflow_id.clone(),
                    reason: e.to_string(),
                }
            })?;

        info!(
            workflow = %task.workflow_name,
            workflow_id = %task.workflow_id,
            deduplicated = outcome.deduplicated,
            "Unscoped workflow started"
        );
        Ok(())
    }

    /// Dispatch through the tenant's execution when the resource has a
    /// tenant, directly otherwise.
    pub async fn dispatch_for(&self, tenant_id: Option<&str>, task: ProvisionTask) -> Result<()> {
        match tenant_id {
            Some(tenant_id) => self.dispatch(tenant_id, task).await,
            None => self.dispatch_unscoped(task).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, MockEngine, RecordedCall};

    fn task(workflow_id: &str) -> ProvisionTask {
        ProvisionTask {
            workflow_name: "CreateWebrootWorkflow".into(),
            workflow_id: workflow_id.into(),
            arg: serde_json::json!({"name": "main"}),
            resource_type: "webroot".into(),
            resource_id: "w1".into(),
        }
    }

    fn dispatcher(engine: &MockEngine) -> ProvisionDispatcher {
        ProvisionDispatcher::new(Arc::new(engine.clone()), Config::default())
    }

    #[tokio::test]
    async fn test_empty_tenant_is_rejected_without_engine_call() {
        let engine = MockEngine::new();
        let err = dispatcher(&engine)
            .dispatch("", task("webroot-main-w1"))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(engine.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_signals_tenant_entity_execution() {
        let engine = MockEngine::new();
        dispatcher(&engine)
            .dispatch("t1", task("webroot-main-w1"))
            .await
            .unwrap();

        let calls = engine.calls().await;
        match &calls[0] {
            RecordedCall::SignalWithStart { start, signal, task } => {
                assert_eq!(start.execution_id, "tenant-t1");
                assert_eq!(start.workflow_type, "TenantProvisionWorkflow");
                assert_eq!(start.task_queue, "hosting-tasks");
                assert_eq!(signal, "provision");
                assert_eq!(task.workflow_id, "webroot-main-w1");
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tasks_for_one_tenant_share_one_execution_in_order() {
        let engine = MockEngine::new();
        let d = dispatcher(&engine);
        d.dispatch("t1", task("a")).await.unwrap();
        d.dispatch("t1", task("b")).await.unwrap();
        d.dispatch("t2", task("c")).await.unwrap();

        assert_eq!(engine.queued("tenant-t1").await, vec!["a", "b"]);
        assert_eq!(engine.queued("tenant-t2").await, vec!["c"]);
    }

    #[tokio::test]
    async fn test_engine_failure_becomes_dispatch_error() {
        let engine = MockEngine::new();
        engine
            .set_failure(Some(EngineError::Misconfigured("no namespace".into())))
            .await;

        let err = dispatcher(&engine)
            .dispatch("t1", task("webroot-main-w1"))
            .await
            .unwrap_err();
        match err {
            CoreError::Dispatch { workflow_id, reason } => {
                assert_eq!(workflow_id, "webroot-main-w1");
                assert!(reason.contains("no namespace"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_for_without_tenant_starts_directly() {
        let engine = MockEngine::new();
        dispatcher(&engine)
            .dispatch_for(None, task("valkey-instance-cache-v1"))
            .await
            .unwrap();

        assert!(matches!(
            &engine.calls().await[0],
            RecordedCall::StartWorkflow { task_queue, .. } if task_queue == "hosting-tasks"
        ));
    }
}
