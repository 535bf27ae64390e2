// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that drives entity executions.
//!
//! Each poll the worker:
//! 1. Reopens closed executions that still hold pending signals. This covers
//!    a signal committed just after the execution was closed.
//! 2. Claims one running execution whose lease is free or expired.
//! 3. Runs its pending signals in `seq` order, renewing the lease while each
//!    workflow runs and after it completes.
//! 4. Closes the execution once no pending signals remain, or releases it
//!    after a batch so other tenants get a turn.
//!
//! Only the lease holder touches an execution's signals, so a tenant's tasks
//! never run concurrently or out of order.

use std::sync::Arc;
use std::time::Duration;

use hosting_core::model::ProvisionTask;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::registry::WorkflowRegistry;
use crate::store::{ExecutionRecord, OutboxStore};

/// Configuration for an entity worker.
#[derive(Debug, Clone)]
pub struct EntityWorkerConfig {
    /// How often to look for claimable executions when idle.
    pub poll_interval: Duration,
    /// Lease granted on claim and on each renewal.
    pub lease: Duration,
    /// Signals processed per claim before the execution is released.
    pub batch_size: usize,
}

impl Default for EntityWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500), // Idle poll
            lease: Duration::from_secs(60),            // Renewed every third while a workflow runs
            batch_size: 32,
        }
    }
}

/// What a single poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// An execution was claimed.
    pub claimed: bool,
    /// Signals run, successful or not.
    pub processed: usize,
    /// The execution was closed at the end of the poll.
    pub closed: bool,
}

/// Worker processing entity executions from the outbox.
pub struct EntityWorker {
    worker_id: String,
    store: Arc<dyn OutboxStore>,
    registry: Arc<WorkflowRegistry>,
    config: EntityWorkerConfig,
    shutdown: Arc<Notify>,
}

impl EntityWorker {
    pub fn new(
        worker_id: impl Into<String>,
        store: Arc<dyn OutboxStore>,
        registry: Arc<WorkflowRegistry>,
        config: EntityWorkerConfig,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            store,
            registry,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Get a handle to trigger shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run until shutdown is notified. Polls again immediately after a busy
    /// poll and sleeps for `poll_interval` after an idle or failed one.
    pub async fn run(&self) {
        info!(
            worker_id = %self.worker_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            lease_secs = self.config.lease.as_secs(),
            "Entity worker started"
        );

        let mut delay = Duration::ZERO;
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!(worker_id = %self.worker_id, "Entity worker shutting down");
                    break;
                }

                _ = tokio::time::sleep(delay) => {
                    delay = match self.tick().await {
                        Ok(report) if report.claimed => Duration::ZERO,
                        Ok(_) => self.config.poll_interval,
                        Err(e) => {
                            error!(worker_id = %self.worker_id, error = %e, "Entity worker poll failed");
                            self.config.poll_interval
                        }
                    };
                }
            }
        }

        info!(worker_id = %self.worker_id, "Entity worker stopped");
    }

    /// Run one poll: recover orphans, claim an execution and process it.
    pub async fn tick(&self) -> Result<TickReport> {
        let reopened = self.store.reopen_orphaned().await?;
        if reopened > 0 {
            warn!(
                worker_id = %self.worker_id,
                count = reopened,
                "Reopened closed executions with pending signals"
            );
        }

        let Some(execution) = self
            .store
            .claim_execution(&self.worker_id, self.config.lease)
            .await?
        else {
            return Ok(TickReport::default());
        };

        debug!(
            worker_id = %self.worker_id,
            execution_id = %execution.execution_id,
            "Execution claimed"
        );

        match self.drain(&execution).await {
            Ok(report) => Ok(report),
            Err(e) => {
                // Hand the execution back instead of waiting for the lease to lapse.
                if let Err(release_err) = self
                    .store
                    .release(&execution.execution_id, &self.worker_id)
                    .await
                {
                    warn!(
                        execution_id = %execution.execution_id,
                        error = %release_err,
                        "Failed to release execution"
                    );
                }
                Err(e)
            }
        }
    }

    async fn drain(&self, execution: &ExecutionRecord) -> Result<TickReport> {
        let id = execution.execution_id.as_str();
        let mut report = TickReport {
            claimed: true,
            ..Default::default()
        };

        loop {
            if report.processed >= self.config.batch_size {
                self.store.release(id, &self.worker_id).await?;
                debug!(execution_id = %id, processed = report.processed, "Execution released after batch");
                return Ok(report);
            }

            let Some(signal) = self.store.next_pending(id).await? else {
                if self.store.close_if_drained(id, &self.worker_id).await? {
                    info!(execution_id = %id, processed = report.processed, "Execution closed");
                    report.closed = true;
                    return Ok(report);
                }
                // A signal arrived after the read, or the lease is gone.
                if !self.renew(id).await? {
                    return Ok(report);
                }
                continue;
            };

            let outcome = match signal.task() {
                Ok(task) => match self.run_holding_lease(id, &task).await? {
                    Some(outcome) => outcome,
                    // Lease lost mid-run; the signal stays pending for the new holder.
                    None => return Ok(report),
                },
                Err(e) => Err(e.into()),
            };
            let error = match &outcome {
                Ok(()) => {
                    info!(
                        execution_id = %id,
                        seq = signal.seq,
                        workflow = %signal.workflow_name,
                        workflow_id = %signal.workflow_id,
                        "Workflow completed"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        execution_id = %id,
                        seq = signal.seq,
                        workflow = %signal.workflow_name,
                        workflow_id = %signal.workflow_id,
                        error = %e,
                        "Workflow failed"
                    );
                    Some(format!("{:#}", e))
                }
            };

            self.store.complete_signal(signal.seq, error.as_deref()).await?;
            report.processed += 1;

            if !self.renew(id).await? {
                return Ok(report);
            }
        }
    }

    /// Run one task while renewing the lease every third of its length.
    ///
    /// Returns `None` when a renewal finds the lease taken; the handler is
    /// dropped at that point so two workers never run the same tenant.
    async fn run_holding_lease(
        &self,
        execution_id: &str,
        task: &ProvisionTask,
    ) -> Result<Option<anyhow::Result<()>>> {
        let period = (self.config.lease / 3).max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let run = self.registry.run(execution_id, task);
        tokio::pin!(run);

        loop {
            tokio::select! {
                biased;

                outcome = &mut run => return Ok(Some(outcome)),

                _ = heartbeat.tick() => {
                    if !self.renew(execution_id).await? {
                        return Ok(None);
                    }
                    debug!(execution_id = %execution_id, "Lease renewed during workflow");
                }
            }
        }
    }

    async fn renew(&self, execution_id: &str) -> Result<bool> {
        let held = self
            .store
            .renew_lease(execution_id, &self.worker_id, self.config.lease)
            .await?;
        if !held {
            warn!(
                worker_id = %self.worker_id,
                execution_id = %execution_id,
                "Lease lost, stopping execution"
            );
        }
        Ok(held)
    }
}
