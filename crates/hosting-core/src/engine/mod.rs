// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Interface to the durable workflow engine.
//!
//! The control plane never runs provisioning work itself. It hands
//! [`ProvisionTask`]s to an engine that owns one long-lived entity execution
//! per tenant and processes that tenant's tasks one at a time, in delivery
//! order. The only primitive required from the engine is an atomic
//! "signal the running execution, or start it and signal it".

mod mock;

pub use self::mock::{MockEngine, RecordedCall};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::ProvisionTask;

/// Where and how to start an entity execution if none is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    /// Execution ID, one per tenant (`tenant-{tenant_id}`).
    pub execution_id: String,
    /// Workflow type of the entity execution.
    pub workflow_type: String,
    pub task_queue: String,
    /// Tenant owning the execution. `None` for unscoped workflows.
    pub tenant_id: Option<String>,
}

/// What the engine did with a submitted task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalOutcome {
    /// A new execution was started for this task.
    pub started: bool,
    /// An identical pending task (same workflow name and ID) was already queued.
    pub deduplicated: bool,
}

/// Transport-level engine failures.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// The engine refused the call.
    #[error("engine rejected request: {0}")]
    Rejected(String),
    /// The engine client is not configured correctly.
    #[error("engine misconfigured: {0}")]
    Misconfigured(String),
}

/// A workflow engine supporting signal-with-start.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Enqueue `task` as a `signal` into the execution described by `start`,
    /// starting that execution first if it is not running. Atomic with
    /// respect to concurrent callers for the same execution ID.
    async fn signal_with_start(
        &self,
        start: &StartOptions,
        signal: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome, EngineError>;

    /// Start the task's workflow directly, keyed by its workflow ID.
    async fn start_workflow(
        &self,
        task_queue: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome, EngineError>;

    /// Short engine name for logs.
    fn engine_type(&self) -> &'static str;
}
