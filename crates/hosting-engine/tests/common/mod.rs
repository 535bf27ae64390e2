// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for hosting-engine integration tests.
//!
//! One in-memory SQLite database holds both the resource tables and the
//! outbox, so core services dispatch straight into the engine under test.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hosting_core::Config;
use hosting_core::engine::StartOptions;
use hosting_core::model::ProvisionTask;
use hosting_core::services::Services;
use hosting_core::store::{ResourceStore, SqliteStore};
use hosting_engine::{
    EntityWorker, EntityWorkerConfig, OutboxEngine, OutboxStore, SqliteOutboxStore,
    WorkflowHandler, WorkflowRegistry,
};
use tokio::sync::Mutex;

/// Handler that records what it ran and fails on request.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    runs: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingHandler {
    /// `(execution_id, workflow_id)` pairs in run order.
    pub async fn runs(&self) -> Vec<(String, String)> {
        self.runs.lock().await.clone()
    }

    pub async fn workflow_ids(&self) -> Vec<String> {
        self.runs.lock().await.iter().map(|(_, id)| id.clone()).collect()
    }

    pub async fn fail_on(&self, workflow_id: &str) {
        self.failing.lock().await.insert(workflow_id.to_string());
    }
}

#[async_trait]
impl WorkflowHandler for RecordingHandler {
    async fn run(&self, execution_id: &str, task: &ProvisionTask) -> anyhow::Result<()> {
        self.runs
            .lock()
            .await
            .push((execution_id.to_string(), task.workflow_id.clone()));
        if self.failing.lock().await.contains(&task.workflow_id) {
            anyhow::bail!("simulated failure of {}", task.workflow_id);
        }
        Ok(())
    }
}

pub struct EngineContext {
    pub outbox: Arc<SqliteOutboxStore>,
    pub engine: OutboxEngine,
    pub services: Services,
    pub handler: RecordingHandler,
}

impl EngineContext {
    pub async fn new() -> Self {
        let outbox = Arc::new(
            SqliteOutboxStore::in_memory()
                .await
                .expect("Failed to create in-memory outbox"),
        );
        let store = Arc::new(SqliteStore::new(outbox.pool().clone()));
        let engine = OutboxEngine::new(outbox.clone() as Arc<dyn OutboxStore>);
        let services = Services::new(
            store as Arc<dyn ResourceStore>,
            Arc::new(engine.clone()),
            Config::default(),
        );
        Self {
            outbox,
            engine,
            services,
            handler: RecordingHandler::default(),
        }
    }

    /// Registry routing every workflow to the recording handler.
    pub fn registry(&self) -> WorkflowRegistry {
        let mut registry = WorkflowRegistry::new();
        registry.set_fallback(Arc::new(self.handler.clone()));
        registry
    }

    pub fn worker(&self, worker_id: &str) -> EntityWorker {
        self.worker_with(worker_id, self.registry(), EntityWorkerConfig::default())
    }

    pub fn worker_with(
        &self,
        worker_id: &str,
        registry: WorkflowRegistry,
        config: EntityWorkerConfig,
    ) -> EntityWorker {
        EntityWorker::new(
            worker_id,
            self.outbox.clone() as Arc<dyn OutboxStore>,
            Arc::new(registry),
            config,
        )
    }

    /// Signal a bare task into `tenant-{tenant_id}`.
    pub async fn signal(&self, tenant_id: &str, workflow_id: &str) -> hosting_core::engine::SignalOutcome {
        self.outbox
            .signal_with_start(&start(tenant_id), "provision", &task(workflow_id))
            .await
            .expect("Failed to signal")
    }

    /// Pending signal states of an execution, in `seq` order.
    pub async fn states(&self, execution_id: &str) -> Vec<(String, String)> {
        self.outbox
            .list_signals(execution_id)
            .await
            .expect("Failed to list signals")
            .into_iter()
            .map(|s| (s.workflow_id, s.state))
            .collect()
    }
}

pub fn start(tenant_id: &str) -> StartOptions {
    StartOptions {
        execution_id: format!("tenant-{}", tenant_id),
        workflow_type: "TenantProvisionWorkflow".to_string(),
        task_queue: "hosting-tasks".to_string(),
        tenant_id: Some(tenant_id.to_string()),
    }
}

pub fn task(workflow_id: &str) -> ProvisionTask {
    ProvisionTask {
        workflow_name: "CreateWebrootWorkflow".to_string(),
        workflow_id: workflow_id.to_string(),
        arg: serde_json::json!({"name": workflow_id}),
        resource_type: "webroot".to_string(),
        resource_id: workflow_id.to_string(),
    }
}

/// Poll `check` every 10ms until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
