// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, new_id, now};
use crate::error::{CoreError, Result};
use crate::model::{CronJobRecord, ResourceKind, ResourceStatus};
use crate::validate;

const DEFAULT_TIMEOUT_SECONDS: i32 = 3600;

impl Resource for CronJobRecord {
    const KIND: ResourceKind = ResourceKind::CronJob;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCronJob {
    pub webroot_id: String,
    pub name: String,
    pub schedule: String,
    pub command: String,
    #[serde(default)]
    pub working_directory: String,
    /// Defaults to one hour.
    pub timeout_seconds: Option<i32>,
    /// Consecutive failures before the job is auto-disabled; 0 never disables.
    #[serde(default)]
    pub max_failures: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCronJob {
    pub schedule: Option<String>,
    pub command: Option<String>,
    pub working_directory: Option<String>,
    pub timeout_seconds: Option<i32>,
    pub max_failures: Option<i32>,
}

#[derive(Clone)]
pub struct CronJobService {
    lifecycle: Lifecycle,
}

impl CronJobService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn create(&self, req: CreateCronJob) -> Result<CronJobRecord> {
        validate::name("name", &req.name)?;
        validate::cron_schedule("schedule", &req.schedule)?;
        validate::required("command", &req.command)?;
        validate::relative_path("working_directory", &req.working_directory)?;
        let timeout_seconds = req.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        validate::positive("timeout_seconds", timeout_seconds)?;
        validate::non_negative("max_failures", req.max_failures)?;

        let store = self.lifecycle.store();
        let webroot = store
            .get_webroot(&req.webroot_id)
            .await?
            .ok_or_else(|| CoreError::not_found("webroot", &req.webroot_id))?;

        let created_at = now();
        let job = CronJobRecord {
            id: new_id(),
            tenant_id: webroot.tenant_id,
            webroot_id: webroot.id,
            name: req.name,
            schedule: req.schedule,
            command: req.command,
            working_directory: req.working_directory,
            timeout_seconds,
            enabled: req.enabled,
            consecutive_failures: 0,
            max_failures: req.max_failures,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_cron_job(&job).await?;

        self.lifecycle.created(&job).await?;
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> Result<CronJobRecord> {
        self.lifecycle
            .store()
            .get_cron_job(id)
            .await?
            .ok_or_else(|| CoreError::not_found("cron_job", id))
    }

    pub async fn list(&self, webroot_id: &str) -> Result<Vec<CronJobRecord>> {
        self.lifecycle.store().list_cron_jobs(webroot_id, &[]).await
    }

    pub async fn update(&self, id: &str, req: UpdateCronJob) -> Result<CronJobRecord> {
        let mut job = self.get(id).await?;
        Lifecycle::check_updatable(&job)?;

        if let Some(schedule) = req.schedule {
            validate::cron_schedule("schedule", &schedule)?;
            job.schedule = schedule;
        }
        if let Some(command) = req.command {
            validate::required("command", &command)?;
            job.command = command;
        }
        if let Some(dir) = req.working_directory {
            validate::relative_path("working_directory", &dir)?;
            job.working_directory = dir;
        }
        if let Some(timeout) = req.timeout_seconds {
            validate::positive("timeout_seconds", timeout)?;
            job.timeout_seconds = timeout;
        }
        if let Some(max_failures) = req.max_failures {
            validate::non_negative("max_failures", max_failures)?;
            job.max_failures = max_failures;
        }

        if !self.lifecycle.store().update_cron_job(&job).await? {
            return Err(CoreError::not_found("cron_job", id));
        }
        self.lifecycle.updated(&job).await?;
        Ok(job)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let job = self.get(id).await?;
        self.lifecycle.delete(&job).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let job = self.get(id).await?;
        self.lifecycle.retry(&job).await
    }

    /// Re-enable a job, including one the failure monitor switched off.
    pub async fn enable(&self, id: &str) -> Result<()> {
        let job = self.get(id).await?;
        self.lifecycle
            .enable(&job, &[ResourceStatus::Active, ResourceStatus::AutoDisabled])
            .await
    }

    pub async fn disable(&self, id: &str) -> Result<()> {
        let job = self.get(id).await?;
        self.lifecycle.disable(&job).await
    }
}
