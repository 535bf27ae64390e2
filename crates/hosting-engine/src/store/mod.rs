// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outbox persistence.
//!
//! An entity execution is a row in `entity_executions`; each task delivered
//! to it is a row in `provision_signals`, processed in `seq` order. At most
//! one worker holds an execution at a time, recorded as `claimed_by` plus a
//! lease deadline. An expired lease makes the execution claimable again.

mod postgres;
mod queries;
mod sqlite;

pub use self::postgres::PgOutboxStore;
pub use self::sqlite::SqliteOutboxStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hosting_core::engine::{SignalOutcome, StartOptions};
use hosting_core::model::ProvisionTask;
use serde::{Deserialize, Serialize};

use crate::error::{OutboxError, Result};

/// Execution status as stored.
pub const EXECUTION_RUNNING: &str = "running";
pub const EXECUTION_CLOSED: &str = "closed";

/// Signal states as stored.
pub const SIGNAL_PENDING: &str = "pending";
pub const SIGNAL_DONE: &str = "done";
pub const SIGNAL_FAILED: &str = "failed";

/// A row of `entity_executions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub tenant_id: Option<String>,
    pub workflow_type: String,
    pub task_queue: String,
    /// `running` or `closed`.
    pub status: String,
    pub claimed_by: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of `provision_signals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SignalRecord {
    pub seq: i64,
    pub execution_id: String,
    pub signal_name: String,
    pub workflow_name: String,
    pub workflow_id: String,
    pub resource_type: String,
    pub resource_id: String,
    /// JSON text of the task argument.
    pub arg: String,
    /// `pending`, `done` or `failed`.
    pub state: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl SignalRecord {
    /// Rebuild the task this signal carries.
    pub fn task(&self) -> Result<ProvisionTask> {
        let arg = serde_json::from_str(&self.arg).map_err(|source| {
            OutboxError::MalformedArgument {
                seq: self.seq,
                source,
            }
        })?;
        Ok(ProvisionTask {
            workflow_name: self.workflow_name.clone(),
            workflow_id: self.workflow_id.clone(),
            arg,
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
        })
    }
}

/// Storage for entity executions and their queued signals.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Upsert the execution to `running` and append the signal, in one
    /// transaction. `started` is set when the execution was created or
    /// reopened; `deduplicated` when an identical task was already pending.
    async fn signal_with_start(
        &self,
        start: &StartOptions,
        signal: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome>;

    /// Reopen closed executions that still have pending signals.
    async fn reopen_orphaned(&self) -> Result<u64>;

    /// Claim one running execution whose lease is absent or expired.
    async fn claim_execution(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<ExecutionRecord>>;

    /// Oldest pending signal of the execution.
    async fn next_pending(&self, execution_id: &str) -> Result<Option<SignalRecord>>;

    /// Mark a signal `done`, or `failed` with the error text.
    async fn complete_signal(&self, seq: i64, error: Option<&str>) -> Result<()>;

    /// Extend the lease. `false` if the worker no longer holds it.
    async fn renew_lease(&self, execution_id: &str, worker_id: &str, lease: Duration)
    -> Result<bool>;

    /// Close the execution if it holds no pending signals. `false` if the
    /// worker lost the lease or a signal arrived.
    async fn close_if_drained(&self, execution_id: &str, worker_id: &str) -> Result<bool>;

    /// Drop the worker's claim without closing the execution.
    async fn release(&self, execution_id: &str, worker_id: &str) -> Result<()>;

    /// Delete up to `limit` done or failed signals processed before `cutoff`.
    async fn prune_signals(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<u64>;

    /// Delete up to `limit` closed executions without pending signals that
    /// were last touched before `cutoff`. Their signals go with them.
    async fn prune_executions(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<u64>;

    async fn get_execution(&self, execution_id: &str) -> Result<Option<ExecutionRecord>>;

    /// Every signal of the execution in `seq` order.
    async fn list_signals(&self, execution_id: &str) -> Result<Vec<SignalRecord>>;
}

/// Lease deadline `lease` from now.
pub(crate) fn lease_deadline(lease: Duration) -> DateTime<Utc> {
    let lease = chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::days(365));
    Utc::now()
        .checked_add_signed(lease)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
