// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that prunes the outbox.
//!
//! Every poll deletes, in batches:
//! 1. `done` and `failed` signals processed more than `max_age` ago.
//! 2. Closed executions untouched for `max_age` that hold no pending
//!    signals. Whatever signals they still have cascade with them.
//!
//! Pending signals and running executions are never touched. A pruned
//! execution is simply started again by the next `signal_with_start`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::config::RetentionConfig;
use crate::error::Result;
use crate::store::OutboxStore;

/// Rows deleted by one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub signals: u64,
    pub executions: u64,
}

/// Worker deleting processed outbox rows past their retention.
pub struct RetentionWorker {
    store: Arc<dyn OutboxStore>,
    config: RetentionConfig,
    shutdown: Arc<Notify>,
}

impl RetentionWorker {
    pub fn new(store: Arc<dyn OutboxStore>, config: RetentionConfig) -> Self {
        Self {
            store,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle to trigger shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Prune every `poll_interval` until shutdown is notified.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Outbox retention worker disabled");
            return;
        }

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_age_hours = self.config.max_age.as_secs() / 3600,
            batch_size = self.config.batch_size,
            "Outbox retention worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Outbox retention worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.prune_once().await {
                        error!(error = %e, "Failed to prune outbox");
                    }
                }
            }
        }

        info!("Outbox retention worker stopped");
    }

    /// Run one retention pass.
    pub async fn prune_once(&self) -> Result<PruneReport> {
        let cutoff = cutoff(self.config.max_age);
        let limit = self.config.batch_size.max(1);
        let mut report = PruneReport::default();

        loop {
            let deleted = self
                .store
                .prune_signals(cutoff, limit)
                .await?;
            report.signals += deleted;
            if deleted < limit as u64 {
                break;
            }
        }

        loop {
            let deleted = self
                .store
                .prune_executions(cutoff, limit)
                .await?;
            report.executions += deleted;
            if deleted < limit as u64 {
                break;
            }
        }

        if report == PruneReport::default() {
            debug!("Outbox retention pass found nothing to prune");
        } else {
            info!(
                signals = report.signals,
                executions = report.executions,
                cutoff = %cutoff,
                "Outbox retention pass completed"
            );
        }
        Ok(report)
    }
}

fn cutoff(max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
