// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, new_id, now};
use crate::error::{CoreError, Result};
use crate::model::{FqdnRecord, ResourceKind, ResourceStatus};
use crate::validate;

impl Resource for FqdnRecord {
    const KIND: ResourceKind = ResourceKind::Fqdn;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.fqdn
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFqdn {
    pub webroot_id: String,
    pub fqdn: String,
    #[serde(default = "default_ssl")]
    pub ssl_enabled: bool,
}

fn default_ssl() -> bool {
    true
}

#[derive(Clone)]
pub struct FqdnService {
    lifecycle: Lifecycle,
}

impl FqdnService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    /// Bind a hostname to a webroot. The FQDN inherits the webroot's tenant.
    pub async fn create(&self, req: CreateFqdn) -> Result<FqdnRecord> {
        let fqdn = req.fqdn.trim().to_ascii_lowercase();
        validate::fqdn("fqdn", &fqdn)?;

        let store = self.lifecycle.store();
        let webroot = store
            .get_webroot(&req.webroot_id)
            .await?
            .ok_or_else(|| CoreError::not_found("webroot", &req.webroot_id))?;
        if webroot.status == ResourceStatus::Deleting {
            return Err(CoreError::validation(
                "webroot_id",
                format!("webroot '{}' is being deleted", webroot.id),
            ));
        }

        let created_at = now();
        let record = FqdnRecord {
            id: new_id(),
            tenant_id: webroot.tenant_id,
            webroot_id: webroot.id,
            fqdn,
            ssl_enabled: req.ssl_enabled,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_fqdn(&record).await?;

        self.lifecycle.created(&record).await?;
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<FqdnRecord> {
        self.lifecycle
            .store()
            .get_fqdn(id)
            .await?
            .ok_or_else(|| CoreError::not_found("fqdn", id))
    }

    pub async fn list(&self, webroot_id: &str) -> Result<Vec<FqdnRecord>> {
        self.lifecycle.store().list_fqdns(webroot_id, &[]).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let record = self.get(id).await?;
        self.lifecycle.delete(&record).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let record = self.get(id).await?;
        self.lifecycle.retry(&record).await
    }
}
