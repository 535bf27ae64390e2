// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, generate_password, new_id, now, shard_with_role};
use crate::error::{CoreError, Result};
use crate::model::{
    DatabaseRecord, DatabaseUserRecord, PrivilegeList, ResourceKind, ResourceStatus, ShardRole,
};
use crate::validate;

impl Resource for DatabaseRecord {
    const KIND: ResourceKind = ResourceKind::Database;

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

impl Resource for DatabaseUserRecord {
    const KIND: ResourceKind = ResourceKind::DatabaseUser;

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
pub struct CreateDatabase {
    /// Owning tenant; `None` for platform-owned databases.
    pub tenant_id: Option<String>,
    pub shard_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDatabaseUser {
    pub database_id: String,
    pub username: String,
    /// Generated when absent.
    pub password: Option<String>,
    #[serde(default = "default_privileges")]
    pub privileges: Vec<String>,
}

fn default_privileges() -> Vec<String> {
    vec!["ALL".to_string()]
}

/// Databases on database shards and their users.
#[derive(Clone)]
pub struct DatabaseService {
    lifecycle: Lifecycle,
}

impl DatabaseService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn create(&self, req: CreateDatabase) -> Result<DatabaseRecord> {
        validate::name("name", &req.name)?;

        let store = self.lifecycle.store();
        shard_with_role(store.as_ref(), &req.shard_id, ShardRole::Database).await?;
        if let Some(tenant_id) = &req.tenant_id
            && store.get_tenant(tenant_id).await?.is_none()
        {
            return Err(CoreError::not_found("tenant", tenant_id));
        }

        let created_at = now();
        let database = DatabaseRecord {
            id: new_id(),
            tenant_id: req.tenant_id,
            shard_id: req.shard_id,
            name: req.name,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_database(&database).await?;

        self.lifecycle.created(&database).await?;
        Ok(database)
    }

    pub async fn get(&self, id: &str) -> Result<DatabaseRecord> {
        self.lifecycle
            .store()
            .get_database(id)
            .await?
            .ok_or_else(|| CoreError::not_found("database", id))
    }

    pub async fn list(&self, shard_id: &str) -> Result<Vec<DatabaseRecord>> {
        self.lifecycle.store().list_databases(shard_id, &[]).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let database = self.get(id).await?;
        self.lifecycle.delete(&database).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let database = self.get(id).await?;
        self.lifecycle.retry(&database).await
    }

    /// Add a user to a database. The user belongs to the database's tenant.
    pub async fn create_user(&self, req: CreateDatabaseUser) -> Result<DatabaseUserRecord> {
        validate::name("username", &req.username)?;
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

        let database = self.get(&req.database_id).await?;
        if database.status == ResourceStatus::Deleting {
            return Err(CoreError::validation(
                "database_id",
                format!("database '{}' is being deleted", database.id),
            ));
        }

        let created_at = now();
        let user = DatabaseUserRecord {
            id: new_id(),
            database_id: database.id,
            tenant_id: database.tenant_id,
            username: req.username,
            password,
            privileges: PrivilegeList::from(req.privileges),
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        self.lifecycle.store().insert_database_user(&user).await?;

        self.lifecycle.created(&user).await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<DatabaseUserRecord> {
        self.lifecycle
            .store()
            .get_database_user(id)
            .await?
            .ok_or_else(|| CoreError::not_found("database_user", id))
    }

    pub async fn list_users(&self, database_id: &str) -> Result<Vec<DatabaseUserRecord>> {
        self.lifecycle
            .store()
            .list_database_users(database_id, &[])
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
