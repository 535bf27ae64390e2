// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow handlers keyed by workflow name.
//!
//! A worker looks up each signal's `workflow_name` here. Names with no
//! registered handler go to the fallback if one is set and fail otherwise.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hosting_core::model::ProvisionTask;
use tracing::info;

/// Executes one provisioning workflow.
#[async_trait]
pub trait WorkflowHandler: Send + Sync {
    /// Run the workflow for `task`. An error marks the signal failed; the
    /// execution moves on to its next signal either way.
    async fn run(&self, execution_id: &str, task: &ProvisionTask) -> anyhow::Result<()>;
}

/// Handler table used by [`EntityWorker`](crate::worker::EntityWorker).
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    handlers: HashMap<String, Arc<dyn WorkflowHandler>>,
    fallback: Option<Arc<dyn WorkflowHandler>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `workflow_name`, replacing any previous one.
    pub fn register(
        &mut self,
        workflow_name: impl Into<String>,
        handler: Arc<dyn WorkflowHandler>,
    ) -> &mut Self {
        self.handlers.insert(workflow_name.into(), handler);
        self
    }

    /// Handler for workflow names without a dedicated registration.
    pub fn set_fallback(&mut self, handler: Arc<dyn WorkflowHandler>) -> &mut Self {
        self.fallback = Some(handler);
        self
    }

    pub fn get(&self, workflow_name: &str) -> Option<&Arc<dyn WorkflowHandler>> {
        self.handlers.get(workflow_name).or(self.fallback.as_ref())
    }

    /// Registered workflow names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run `task` with its handler.
    pub async fn run(&self, execution_id: &str, task: &ProvisionTask) -> anyhow::Result<()> {
        match self.get(&task.workflow_name) {
            Some(handler) => handler.run(execution_id, task).await,
            None => Err(anyhow::anyhow!(
                "no handler registered for workflow '{}' ({})",
                task.workflow_name,
                task.workflow_id
            )),
        }
    }
}

/// Handler that records the hand-off and succeeds.
///
/// Used when convergence is performed by node agents pulling desired state,
/// so the workflow itself has nothing to execute locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

#[async_trait]
impl WorkflowHandler for LogHandler {
    async fn run(&self, execution_id: &str, task: &ProvisionTask) -> anyhow::Result<()> {
        info!(
            execution_id = %execution_id,
            workflow = %task.workflow_name,
            workflow_id = %task.workflow_id,
            resource_type = %task.resource_type,
            resource_id = %task.resource_id,
            "Workflow handed off"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(workflow_name: &str) -> ProvisionTask {
        ProvisionTask {
            workflow_name: workflow_name.into(),
            workflow_id: "webroot-main-w1".into(),
            arg: serde_json::Value::Null,
            resource_type: "webroot".into(),
            resource_id: "w1".into(),
        }
    }

    #[tokio::test]
    async fn test_unknown_workflow_fails_with_name() {
        let registry = WorkflowRegistry::new();
        let err = registry
            .run("tenant-t1", &task("CreateWebrootWorkflow"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CreateWebrootWorkflow"));
        assert!(err.to_string().contains("webroot-main-w1"));
    }

    #[tokio::test]
    async fn test_fallback_handles_unregistered_names() {
        let mut registry = WorkflowRegistry::new();
        registry.set_fallback(Arc::new(LogHandler));
        registry
            .run("tenant-t1", &task("CreateWebrootWorkflow"))
            .await
            .unwrap();
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = WorkflowRegistry::new();
        registry
            .register("UpdateWebrootWorkflow", Arc::new(LogHandler))
            .register("CreateWebrootWorkflow", Arc::new(LogHandler));
        assert_eq!(
            registry.names(),
            vec!["CreateWebrootWorkflow", "UpdateWebrootWorkflow"]
        );
    }
}
