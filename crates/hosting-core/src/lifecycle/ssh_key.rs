// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, new_id, now};
use crate::error::{CoreError, Result};
use crate::model::{ResourceKind, ResourceStatus, SshKeyRecord};
use crate::validate;

const KEY_TYPES: &[&str] = &[
    "ssh-ed25519",
    "ssh-rsa",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
];

impl Resource for SshKeyRecord {
    const KIND: ResourceKind = ResourceKind::SshKey;

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
pub struct CreateSshKey {
    pub tenant_id: String,
    pub name: String,
    /// OpenSSH `authorized_keys` line.
    pub public_key: String,
}

#[derive(Clone)]
pub struct SshKeyService {
    lifecycle: Lifecycle,
}

impl SshKeyService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn create(&self, req: CreateSshKey) -> Result<SshKeyRecord> {
        validate::name("name", &req.name)?;
        let public_key = req.public_key.trim().to_string();
        check_public_key(&public_key)?;

        let store = self.lifecycle.store();
        if store.get_tenant(&req.tenant_id).await?.is_none() {
            return Err(CoreError::not_found("tenant", &req.tenant_id));
        }

        let created_at = now();
        let key = SshKeyRecord {
            id: new_id(),
            tenant_id: req.tenant_id,
            name: req.name,
            public_key,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_ssh_key(&key).await?;

        self.lifecycle.created(&key).await?;
        Ok(key)
    }

    pub async fn get(&self, id: &str) -> Result<SshKeyRecord> {
        self.lifecycle
            .store()
            .get_ssh_key(id)
            .await?
            .ok_or_else(|| CoreError::not_found("ssh_key", id))
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<SshKeyRecord>> {
        self.lifecycle.store().list_ssh_keys(tenant_id, &[]).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let key = self.get(id).await?;
        self.lifecycle.delete(&key).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let key = self.get(id).await?;
        self.lifecycle.retry(&key).await
    }
}

fn check_public_key(key: &str) -> Result<()> {
    let mut parts = key.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(key_type), Some(_)) if KEY_TYPES.contains(&key_type) => Ok(()),
        (Some(key_type), Some(_)) => Err(CoreError::validation(
            "public_key",
            format!("unsupported key type '{}'", key_type),
        )),
        _ => Err(CoreError::validation(
            "public_key",
            "expected '<type> <base64> [comment]'",
        )),
    }
}
