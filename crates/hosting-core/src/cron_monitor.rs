// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Consecutive-failure tracking for cron jobs.
//!
//! Node agents report every cron run. Failures accumulate in
//! `consecutive_failures`; a success resets it. Once the count reaches the
//! job's `max_failures` an active job is switched to `auto_disabled` and a
//! disable workflow is dispatched on a best-effort basis. Jobs in any other
//! status only count.

use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::lifecycle::{Lifecycle, Verb};
use crate::model::ResourceKind;

/// Applies cron run outcomes reported by node agents.
#[derive(Clone)]
pub struct FailureThresholdMonitor {
    lifecycle: Lifecycle,
}

impl FailureThresholdMonitor {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    /// Record one run of cron job `id`.
    ///
    /// Dispatch errors for the disable workflow are logged and swallowed:
    /// the `auto_disabled` row is already committed and agents must not see
    /// a failed report because the engine was briefly unreachable.
    pub async fn report_cron_outcome(&self, id: &str, success: bool) -> Result<()> {
        let store = self.lifecycle.store();

        if success {
            if !store.reset_cron_failures(id).await? {
                return Err(CoreError::not_found(ResourceKind::CronJob.as_str(), id));
            }
            debug!(cron_job_id = %id, "Cron run succeeded");
            return Ok(());
        }

        let counts = store
            .increment_cron_failures(id)
            .await?
            .ok_or_else(|| CoreError::not_found(ResourceKind::CronJob.as_str(), id))?;
        debug!(
            cron_job_id = %id,
            consecutive_failures = counts.consecutive_failures,
            max_failures = counts.max_failures,
            "Cron run failed"
        );

        let threshold_reached = counts.max_failures > 0
            && counts.consecutive_failures >= counts.max_failures
            && counts.enabled;
        if !threshold_reached {
            return Ok(());
        }

        let message = format!(
            "auto-disabled after {} consecutive failures",
            counts.consecutive_failures
        );
        if !store.auto_disable_cron_job(id, &message).await? {
            // Another report disabled it first, or the job is not active.
            return Ok(());
        }
        info!(
            cron_job_id = %id,
            tenant_id = %counts.tenant_id,
            consecutive_failures = counts.consecutive_failures,
            "Cron job auto-disabled"
        );

        let Some(job) = store.get_cron_job(id).await? else {
            return Ok(());
        };
        if let Err(e) = self.lifecycle.dispatch(Verb::Disable, &job).await {
            warn!(
                cron_job_id = %id,
                error = %e,
                "Failed to dispatch disable workflow for auto-disabled cron job"
            );
        }
        Ok(())
    }
}
