// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The declarative configuration document pulled by node agents.
//!
//! Exactly one role collection is present per document, selected by the
//! `shard_role` tag:
//!
//! ```json
//! {"node_id": "n1", "shard_id": "s1", "shard_role": "lb",
//!  "fqdn_mappings": [{"fqdn": "example.com", "lb_backend": "web-1"}]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{PrivilegeList, ResourceStatus, ShardRole};

/// Per-node desired configuration. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    pub node_id: String,
    pub shard_id: String,
    #[serde(flatten)]
    pub role: RoleState,
}

impl DesiredState {
    pub fn shard_role(&self) -> ShardRole {
        self.role.shard_role()
    }
}

/// Role-specific payload of a [`DesiredState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shard_role", rename_all = "snake_case")]
pub enum RoleState {
    Web { tenants: Vec<DesiredTenant> },
    Database { databases: Vec<DesiredDatabase> },
    Valkey { valkey_instances: Vec<DesiredValkeyInstance> },
    Lb { fqdn_mappings: Vec<DesiredFqdnMapping> },
    Storage { s3_buckets: Vec<DesiredS3Bucket> },
}

impl RoleState {
    pub fn shard_role(&self) -> ShardRole {
        match self {
            Self::Web { .. } => ShardRole::Web,
            Self::Database { .. } => ShardRole::Database,
            Self::Valkey { .. } => ShardRole::Valkey,
            Self::Lb { .. } => ShardRole::Lb,
            Self::Storage { .. } => ShardRole::Storage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredTenant {
    pub id: String,
    pub name: String,
    pub uid: i32,
    pub sftp_enabled: bool,
    pub ssh_enabled: bool,
    /// `active` or `suspended`; agents block suspended tenants.
    pub status: ResourceStatus,
    pub webroots: Vec<DesiredWebroot>,
    pub ssh_keys: Vec<DesiredSshKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredWebroot {
    pub id: String,
    pub name: String,
    pub runtime: String,
    pub runtime_version: String,
    pub runtime_config: serde_json::Value,
    pub public_folder: String,
    pub env_file_name: String,
    pub env_vars: BTreeMap<String, String>,
    pub status: ResourceStatus,
    pub fqdns: Vec<DesiredFqdn>,
    pub cron_jobs: Vec<DesiredCronJob>,
    pub daemons: Vec<DesiredDaemon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredFqdn {
    pub fqdn: String,
    pub ssl_enabled: bool,
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredCronJob {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub command: String,
    pub working_directory: String,
    pub timeout_seconds: i32,
    pub enabled: bool,
    /// `auto_disabled` jobs are listed so agents remove their timers.
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredDaemon {
    pub id: String,
    pub node_id: Option<String>,
    pub name: String,
    pub command: String,
    pub num_procs: i32,
    pub enabled: bool,
    pub proxy_path: Option<String>,
    pub proxy_port: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredSshKey {
    pub id: String,
    pub name: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredDatabase {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub users: Vec<DesiredDatabaseUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredDatabaseUser {
    pub id: String,
    pub username: String,
    pub password: String,
    pub privileges: PrivilegeList,
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredValkeyInstance {
    pub id: String,
    pub name: String,
    pub port: i32,
    pub password: String,
    pub max_memory_mb: i32,
    pub status: ResourceStatus,
    pub users: Vec<DesiredValkeyUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredValkeyUser {
    pub id: String,
    pub username: String,
    pub password: String,
    pub privileges: PrivilegeList,
    pub key_pattern: String,
    pub status: ResourceStatus,
}

/// One row of an LB routing table. `lb_backend` is null when the owning
/// web shard has no backend configured yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DesiredFqdnMapping {
    pub fqdn: String,
    pub lb_backend: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredS3Bucket {
    pub id: String,
    pub name: String,
    pub tenant_id: Option<String>,
    pub public: bool,
    pub quota_bytes: i64,
    pub status: ResourceStatus,
}
