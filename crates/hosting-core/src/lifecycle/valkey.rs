// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, generate_password, new_id, now, shard_with_role};
use crate::error::{CoreError, Result};
use crate::model::{
    PrivilegeList, ResourceKind, ResourceStatus, ShardRole, ValkeyInstanceRecord,
    ValkeyUserRecord,
};
use crate::placement::Placement;
use crate::validate;

const DEFAULT_MAX_MEMORY_MB: i32 = 64;

impl Resource for ValkeyInstanceRecord {
    const KIND: ResourceKind = ResourceKind::ValkeyInstance;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

impl Resource for ValkeyUserRecord {
    const KIND: ResourceKind = ResourceKind::ValkeyUser;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.username
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateValkeyInstance {
    pub tenant_id: Option<String>,
    pub shard_id: String,
    pub name: String,
    pub max_memory_mb: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateValkeyUser {
    pub valkey_instance_id: String,
    pub username: String,
    pub password: Option<String>,
    #[serde(default = "default_privileges")]
    pub privileges: Vec<String>,
    #[serde(default = "default_key_pattern")]
    pub key_pattern: String,
}

fn default_privileges() -> Vec<String> {
    vec!["+@all".to_string()]
}

fn default_key_pattern() -> String {
    "~*".to_string()
}

/// Valkey instances on valkey shards and their ACL users.
#[derive(Clone)]
pub struct ValkeyService {
    lifecycle: Lifecycle,
    placement: Placement,
}

impl ValkeyService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        let placement = Placement::new(lifecycle.store().clone());
        Self {
            lifecycle,
            placement,
        }
    }

    /// Create an instance on the next free port of its shard.
    ///
    /// Two concurrent creates on one shard may pick the same port; the
    /// loser fails on the `(shard_id, port)` unique constraint.
    pub async fn create(&self, req: CreateValkeyInstance) -> Result<ValkeyInstanceRecord> {
        validate::name("name", &req.name)?;
        let max_memory_mb = req.max_memory_mb.unwrap_or(DEFAULT_MAX_MEMORY_MB);
        validate::positive("max_memory_mb", max_memory_mb)?;

        let store = self.lifecycle.store();
        shard_with_role(store.as_ref(), &req.shard_id, ShardRole::Valkey).await?;
        if let Some(tenant_id) = &req.tenant_id
            && store.get_tenant(tenant_id).await?.is_none()
        {
            return Err(CoreError::not_found("tenant", tenant_id));
        }

        let port = self.placement.valkey_port(&req.shard_id).await?;

        let created_at = now();
        let instance = ValkeyInstanceRecord {
            id: new_id(),
            tenant_id: req.tenant_id,
            shard_id: req.shard_id,
            name: req.name,
            port,
            password: generate_password(),
            max_memory_mb,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_valkey_instance(&instance).await?;

        self.lifecycle.created(&instance).await?;
        Ok(instance)
    }

    pub async fn get(&self, id: &str) -> Result<ValkeyInstanceRecord> {
        self.lifecycle
            .store()
            .get_valkey_instance(id)
            .await?
            .ok_or_else(|| CoreError::not_found("valkey_instance", id))
    }

    pub async fn list(&self, shard_id: &str) -> Result<Vec<ValkeyInstanceRecord>> {
        self.lifecycle
            .store()
            .list_valkey_instances(shard_id, &[])
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let instance = self.get(id).await?;
        self.lifecycle.delete(&instance).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let instance = self.get(id).await?;
        self.lifecycle.retry(&instance).await
    }

    pub async fn create_user(&self, req: CreateValkeyUser) -> Result<ValkeyUserRecord> {
        validate::name("username", &req.username)?;
        validate::required("key_pattern", &req.key_pattern)?;
        if req.privileges.is_empty() {
            return Err(CoreError::validation("privileges", "must not be empty"));
        }
        let password = match req.password {
            Some(password) => {
                validate::required("password", &password)?;
                password
            }
            None => generate_password(),
        };

        let instance = self.get(&req.valkey_instance_id).await?;
        if instance.status == ResourceStatus::Deleting {
            return Err(CoreError::validation(
                "valkey_instance_id",
                format!("valkey instance '{}' is being deleted", instance.id),
            ));
        }

        let created_at = now();
        let user = ValkeyUserRecord {
            id: new_id(),
            valkey_instance_id: instance.id,
            tenant_id: instance.tenant_id,
            username: req.username,
            password,
            privileges: PrivilegeList::from(req.privileges),
            key_pattern: req.key_pattern,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        self.lifecycle.store().insert_valkey_user(&user).await?;

        self.lifecycle.created(&user).await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<ValkeyUserRecord> {
        self.lifecycle
            .store()
            .get_valkey_user(id)
            .await?
            .ok_or_else(|| CoreError::not_found("valkey_user", id))
    }

    pub async fn list_users(&self, instance_id: &str) -> Result<Vec<ValkeyUserRecord>> {
        self.lifecycle
            .store()
            .list_valkey_users(instance_id, &[])
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let user = self.get_user(id).await?;
        self.lifecycle.delete(&user).await
    }

    pub async fn retry_user(&self, id: &str) -> Result<()> {
        let user = self.get_user(id).await?;
        self.lifecycle.retry(&user).await
    }
}
