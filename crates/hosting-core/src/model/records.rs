// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Rows of the resource store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ResourceStatus, ShardRole};

/// Shard record. Infrastructure metadata, not lifecycle-managed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShardRecord {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: ShardRole,
    /// Backend address LB nodes route this shard's FQDNs to.
    pub lb_backend: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Node record. A node belongs to at most one shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NodeRecord {
    pub id: String,
    pub cluster_id: String,
    pub hostname: String,
    pub shard_id: Option<String>,
    /// `active` nodes are eligible for placement.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    /// POSIX uid on web nodes.
    pub uid: i32,
    pub shard_id: Option<String>,
    pub sftp_enabled: bool,
    pub ssh_enabled: bool,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebrootRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub runtime: String,
    pub runtime_version: String,
    /// Runtime-specific settings as a JSON document.
    pub runtime_config: String,
    pub public_folder: String,
    pub env_file_name: String,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Environment variable of a webroot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnvVarRecord {
    pub webroot_id: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FqdnRecord {
    pub id: String,
    pub tenant_id: String,
    pub webroot_id: String,
    pub fqdn: String,
    pub ssl_enabled: bool,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CronJobRecord {
    pub id: String,
    pub tenant_id: String,
    pub webroot_id: String,
    pub name: String,
    /// Five-field cron expression.
    pub schedule: String,
    pub command: String,
    /// Relative to the webroot.
    pub working_directory: String,
    pub timeout_seconds: i32,
    pub enabled: bool,
    pub consecutive_failures: i32,
    /// Zero disables automatic disabling.
    pub max_failures: i32,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DaemonRecord {
    pub id: String,
    pub tenant_id: String,
    pub webroot_id: String,
    /// Unassigned when the tenant has no shard.
    pub node_id: Option<String>,
    pub name: String,
    pub command: String,
    pub proxy_path: Option<String>,
    pub proxy_port: Option<i32>,
    pub num_procs: i32,
    pub enabled: bool,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SshKeyRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub public_key: String,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatabaseRecord {
    pub id: String,
    pub tenant_id: Option<String>,
    pub shard_id: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatabaseUserRecord {
    pub id: String,
    pub database_id: String,
    pub tenant_id: Option<String>,
    pub username: String,
    pub password: String,
    #[sqlx(try_from = "String")]
    pub privileges: PrivilegeList,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ValkeyInstanceRecord {
    pub id: String,
    pub tenant_id: Option<String>,
    pub shard_id: String,
    pub name: String,
    pub port: i32,
    pub password: String,
    pub max_memory_mb: i32,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ValkeyUserRecord {
    pub id: String,
    pub valkey_instance_id: String,
    pub tenant_id: Option<String>,
    pub username: String,
    pub password: String,
    #[sqlx(try_from = "String")]
    pub privileges: PrivilegeList,
    pub key_pattern: String,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct S3BucketRecord {
    pub id: String,
    pub tenant_id: Option<String>,
    pub shard_id: String,
    pub name: String,
    pub public: bool,
    pub quota_bytes: i64,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Privileges stored as a comma-separated column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeList(pub Vec<String>);

impl PrivilegeList {
    /// Column representation.
    pub fn to_column(&self) -> String {
        self.0.join(",")
    }
}

impl From<String> for PrivilegeList {
    fn from(value: String) -> Self {
        PrivilegeList(
            value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<Vec<String>> for PrivilegeList {
    fn from(value: Vec<String>) -> Self {
        PrivilegeList(value)
    }
}
