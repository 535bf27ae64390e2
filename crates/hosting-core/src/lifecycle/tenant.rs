// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, new_id, now, shard_with_role};
use crate::error::{CoreError, Result};
use crate::model::{ResourceKind, ResourceStatus, ShardRole, TenantRecord};
use crate::validate;

impl Resource for TenantRecord {
    const KIND: ResourceKind = ResourceKind::Tenant;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// A tenant's own work runs in its own entity execution.
    fn tenant_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    /// Web shard hosting the tenant. Unplaced tenants get no desired state.
    pub shard_id: Option<String>,
    #[serde(default)]
    pub sftp_enabled: bool,
    #[serde(default)]
    pub ssh_enabled: bool,
}

#[derive(Clone)]
pub struct TenantService {
    lifecycle: Lifecycle,
}

impl TenantService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    /// Insert a `pending` tenant and dispatch its create workflow.
    pub async fn create(&self, req: CreateTenant) -> Result<TenantRecord> {
        validate::name("name", &req.name)?;

        if let Some(shard_id) = &req.shard_id {
            shard_with_role(self.lifecycle.store().as_ref(), shard_id, ShardRole::Web).await?;
        }

        let created_at = now();
        let tenant = TenantRecord {
            id: new_id(),
            name: req.name,
            uid: 0,
            shard_id: req.shard_id,
            sftp_enabled: req.sftp_enabled,
            ssh_enabled: req.ssh_enabled,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        let tenant = self.lifecycle.store().insert_tenant(&tenant).await?;

        self.lifecycle.created(&tenant).await?;
        Ok(tenant)
    }

    pub async fn get(&self, id: &str) -> Result<TenantRecord> {
        self.lifecycle
            .store()
            .get_tenant(id)
            .await?
            .ok_or_else(|| CoreError::not_found("tenant", id))
    }

    pub async fn list(&self) -> Result<Vec<TenantRecord>> {
        self.lifecycle.store().list_tenants().await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let tenant = self.get(id).await?;
        self.lifecycle.delete(&tenant).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let tenant = self.get(id).await?;
        self.lifecycle.retry(&tenant).await
    }

    pub async fn suspend(&self, id: &str) -> Result<()> {
        let tenant = self.get(id).await?;
        self.lifecycle.suspend(&tenant).await
    }

    pub async fn unsuspend(&self, id: &str) -> Result<()> {
        let tenant = self.get(id).await?;
        self.lifecycle.unsuspend(&tenant).await
    }
}
