// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource store interfaces and backend implementations.
//!
//! Both backends run the same SQL: positional `$N` parameters, `RETURNING`,
//! statuses as TEXT and timestamps bound from the application clock.
//!
//! Filters taking `statuses: &[ResourceStatus]` match every status when the
//! slice is empty.

mod postgres;
mod queries;
mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    CronJobRecord, DaemonRecord, DatabaseRecord, DatabaseUserRecord, DesiredFqdnMapping,
    EnvVarRecord, FqdnRecord, NodeRecord, ResourceKind, ResourceStatus, S3BucketRecord,
    ShardRecord, SshKeyRecord, TenantRecord, ValkeyInstanceRecord, ValkeyUserRecord,
    WebrootRecord,
};

/// Failure counters read back after a failed cron run was recorded.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CronFailureCount {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub consecutive_failures: i32,
    pub max_failures: i32,
    pub enabled: bool,
}

/// Persistence for every resource type.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    // ========================================================================
    // Lifecycle (any resource kind)
    // ========================================================================

    /// Current status of a row, `None` if it does not exist.
    async fn current_status(&self, kind: ResourceKind, id: &str)
    -> Result<Option<ResourceStatus>>;

    /// Set status and message if the row's status is one of `from`.
    /// Returns false when no row matched.
    async fn transition(
        &self,
        kind: ResourceKind,
        id: &str,
        from: &[ResourceStatus],
        to: ResourceStatus,
        message: Option<&str>,
    ) -> Result<bool>;

    /// Set `enabled` together with a status change, guarded like
    /// [`transition`](Self::transition). Enabling a cron job also resets its
    /// failure counter.
    async fn set_enabled(
        &self,
        kind: ResourceKind,
        id: &str,
        enabled: bool,
        from: &[ResourceStatus],
        to: ResourceStatus,
    ) -> Result<bool>;

    /// Hard-delete a row.
    async fn delete_row(&self, kind: ResourceKind, id: &str) -> Result<bool>;

    // ========================================================================
    // Shards and nodes
    // ========================================================================

    async fn insert_shard(&self, shard: &ShardRecord) -> Result<()>;
    async fn get_shard(&self, id: &str) -> Result<Option<ShardRecord>>;
    async fn list_shards(&self) -> Result<Vec<ShardRecord>>;
    async fn insert_node(&self, node: &NodeRecord) -> Result<()>;
    async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>>;
    async fn list_nodes(&self, shard_id: &str) -> Result<Vec<NodeRecord>>;
    async fn set_node_status(&self, id: &str, status: &str) -> Result<bool>;

    // ========================================================================
    // Tenants
    // ========================================================================

    /// Insert a tenant, allocating the next free uid. Returns the stored row.
    async fn insert_tenant(&self, tenant: &TenantRecord) -> Result<TenantRecord>;
    async fn get_tenant(&self, id: &str) -> Result<Option<TenantRecord>>;
    async fn list_tenants(&self) -> Result<Vec<TenantRecord>>;
    async fn list_tenants_on_shard(
        &self,
        shard_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<TenantRecord>>;

    // ========================================================================
    // Webroots
    // ========================================================================

    async fn insert_webroot(&self, webroot: &WebrootRecord) -> Result<()>;
    async fn get_webroot(&self, id: &str) -> Result<Option<WebrootRecord>>;
    async fn list_webroots(
        &self,
        tenant_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<WebrootRecord>>;
    /// Write the mutable webroot fields.
    async fn update_webroot(&self, webroot: &WebrootRecord) -> Result<bool>;
    /// Replace the full environment of a webroot.
    async fn replace_env_vars(
        &self,
        webroot_id: &str,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<()>;
    async fn list_env_vars(&self, webroot_id: &str) -> Result<Vec<EnvVarRecord>>;

    // ========================================================================
    // FQDNs
    // ========================================================================

    async fn insert_fqdn(&self, fqdn: &FqdnRecord) -> Result<()>;
    async fn get_fqdn(&self, id: &str) -> Result<Option<FqdnRecord>>;
    async fn list_fqdns(
        &self,
        webroot_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<FqdnRecord>>;
    /// FQDN routing rows for the web shards of a cluster.
    async fn list_fqdn_mappings(
        &self,
        cluster_id: &str,
        fqdn_statuses: &[ResourceStatus],
        tenant_statuses: &[ResourceStatus],
    ) -> Result<Vec<DesiredFqdnMapping>>;

    // ========================================================================
    // Cron jobs
    // ========================================================================

    async fn insert_cron_job(&self, job: &CronJobRecord) -> Result<()>;
    async fn get_cron_job(&self, id: &str) -> Result<Option<CronJobRecord>>;
    async fn list_cron_jobs(
        &self,
        webroot_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<CronJobRecord>>;
    async fn update_cron_job(&self, job: &CronJobRecord) -> Result<bool>;
    async fn reset_cron_failures(&self, id: &str) -> Result<bool>;
    /// Increment the failure counter and read back the counters.
    async fn increment_cron_failures(&self, id: &str) -> Result<Option<CronFailureCount>>;
    /// Disable a job that is still enabled and active. Returns false if
    /// another reporter (or an operator) got there first, or if the job is
    /// mid-transition.
    async fn auto_disable_cron_job(&self, id: &str, message: &str) -> Result<bool>;

    // ========================================================================
    // Daemons
    // ========================================================================

    async fn insert_daemon(&self, daemon: &DaemonRecord) -> Result<()>;
    async fn get_daemon(&self, id: &str) -> Result<Option<DaemonRecord>>;
    async fn list_daemons(
        &self,
        webroot_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<DaemonRecord>>;
    async fn update_daemon(&self, daemon: &DaemonRecord) -> Result<bool>;
    /// Active node of a shard with the fewest daemons, lowest ID on ties.
    async fn least_loaded_node(&self, shard_id: &str) -> Result<Option<String>>;

    // ========================================================================
    // SSH keys
    // ========================================================================

    async fn insert_ssh_key(&self, key: &SshKeyRecord) -> Result<()>;
    async fn get_ssh_key(&self, id: &str) -> Result<Option<SshKeyRecord>>;
    async fn list_ssh_keys(
        &self,
        tenant_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<SshKeyRecord>>;

    // ========================================================================
    // Databases
    // ========================================================================

    async fn insert_database(&self, database: &DatabaseRecord) -> Result<()>;
    async fn get_database(&self, id: &str) -> Result<Option<DatabaseRecord>>;
    async fn list_databases(
        &self,
        shard_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<DatabaseRecord>>;
    async fn insert_database_user(&self, user: &DatabaseUserRecord) -> Result<()>;
    async fn get_database_user(&self, id: &str) -> Result<Option<DatabaseUserRecord>>;
    async fn list_database_users(
        &self,
        database_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<DatabaseUserRecord>>;

    // ========================================================================
    // Valkey
    // ========================================================================

    async fn insert_valkey_instance(&self, instance: &ValkeyInstanceRecord) -> Result<()>;
    async fn get_valkey_instance(&self, id: &str) -> Result<Option<ValkeyInstanceRecord>>;
    async fn list_valkey_instances(
        &self,
        shard_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<ValkeyInstanceRecord>>;
    /// `MAX(port) + 1` over the shard, floor 6380.
    async fn next_valkey_port(&self, shard_id: &str) -> Result<i32>;
    async fn insert_valkey_user(&self, user: &ValkeyUserRecord) -> Result<()>;
    async fn get_valkey_user(&self, id: &str) -> Result<Option<ValkeyUserRecord>>;
    async fn list_valkey_users(
        &self,
        instance_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<ValkeyUserRecord>>;

    // ========================================================================
    // S3 buckets
    // ========================================================================

    async fn insert_s3_bucket(&self, bucket: &S3BucketRecord) -> Result<()>;
    async fn get_s3_bucket(&self, id: &str) -> Result<Option<S3BucketRecord>>;
    async fn list_s3_buckets(
        &self,
        shard_id: &str,
        statuses: &[ResourceStatus],
    ) -> Result<Vec<S3BucketRecord>>;
}

/// `" AND {column} IN ($start, $start+1, ...)"`, or nothing for an empty set.
pub(crate) fn status_filter(column: &str, start: usize, statuses: &[ResourceStatus]) -> String {
    if statuses.is_empty() {
        return String::new();
    }
    let params = (0..statuses.len())
        .map(|i| format!("${}", start + i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" AND {} IN ({})", column, params)
}
