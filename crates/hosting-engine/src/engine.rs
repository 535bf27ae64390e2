// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! [`WorkflowEngine`] backed by the durable outbox.

use std::sync::Arc;

use async_trait::async_trait;
use hosting_core::engine::{EngineError, SignalOutcome, StartOptions, WorkflowEngine};
use hosting_core::model::ProvisionTask;
use tracing::debug;

use crate::store::OutboxStore;

/// Signal name used for workflows started without a tenant execution.
pub const START_SIGNAL: &str = "start";

/// Submits tasks to the outbox. Processing happens in [`EntityWorker`](crate::worker::EntityWorker)s.
#[derive(Clone)]
pub struct OutboxEngine {
    store: Arc<dyn OutboxStore>,
}

impl OutboxEngine {
    pub fn new(store: Arc<dyn OutboxStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn OutboxStore> {
        &self.store
    }
}

#[async_trait]
impl WorkflowEngine for OutboxEngine {
    async fn signal_with_start(
        &self,
        start: &StartOptions,
        signal: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome, EngineError> {
        let outcome = self.store.signal_with_start(start, signal, task).await?;
        debug!(
            execution_id = %start.execution_id,
            workflow_id = %task.workflow_id,
            started = outcome.started,
            deduplicated = outcome.deduplicated,
            "Signal queued"
        );
        Ok(outcome)
    }

    /// A standalone workflow is a one-signal execution keyed by its workflow ID.
    async fn start_workflow(
        &self,
        task_queue: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome, EngineError> {
        let start = StartOptions {
            execution_id: task.workflow_id.clone(),
            workflow_type: task.workflow_name.clone(),
            task_queue: task_queue.to_string(),
            tenant_id: None,
        };
        self.signal_with_start(&start, START_SIGNAL, task).await
    }

    fn engine_type(&self) -> &'static str {
        "outbox"
    }
}
