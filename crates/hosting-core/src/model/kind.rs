// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every lifecycle-managed resource type.
///
/// The kind fixes the backing table, the column used as the human-readable
/// name in workflow IDs, and the naming of the workflows dispatched for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tenant,
    Webroot,
    Fqdn,
    CronJob,
    Daemon,
    SshKey,
    Database,
    DatabaseUser,
    ValkeyInstance,
    ValkeyUser,
    S3Bucket,
}

impl ResourceKind {
    /// `resource_type` recorded on provision tasks and in errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Webroot => "webroot",
            Self::Fqdn => "fqdn",
            Self::CronJob => "cron_job",
            Self::Daemon => "daemon",
            Self::SshKey => "ssh_key",
            Self::Database => "database",
            Self::DatabaseUser => "database_user",
            Self::ValkeyInstance => "valkey_instance",
            Self::ValkeyUser => "valkey_user",
            Self::S3Bucket => "s3_bucket",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Tenant => "tenants",
            Self::Webroot => "webroots",
            Self::Fqdn => "fqdns",
            Self::CronJob => "cron_jobs",
            Self::Daemon => "daemons",
            Self::SshKey => "ssh_keys",
            Self::Database => "databases",
            Self::DatabaseUser => "database_users",
            Self::ValkeyInstance => "valkey_instances",
            Self::ValkeyUser => "valkey_users",
            Self::S3Bucket => "s3_buckets",
        }
    }

    /// Prefix of the create workflow ID. Other verbs prepend `{verb}-`.
    pub fn workflow_prefix(&self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Webroot => "webroot",
            Self::Fqdn => "fqdn",
            Self::CronJob => "cron-job",
            Self::Daemon => "daemon",
            Self::SshKey => "ssh-key",
            Self::Database => "database",
            Self::DatabaseUser => "database-user",
            Self::ValkeyInstance => "valkey-instance",
            Self::ValkeyUser => "valkey-user",
            Self::S3Bucket => "s3-bucket",
        }
    }

    /// Noun used in workflow type names, e.g. `CreateCronJobWorkflow`.
    pub fn workflow_noun(&self) -> &'static str {
        match self {
            Self::Tenant => "Tenant",
            Self::Webroot => "Webroot",
            Self::Fqdn => "FQDN",
            Self::CronJob => "CronJob",
            Self::Daemon => "Daemon",
            Self::SshKey => "SSHKey",
            Self::Database => "Database",
            Self::DatabaseUser => "DatabaseUser",
            Self::ValkeyInstance => "ValkeyInstance",
            Self::ValkeyUser => "ValkeyUser",
            Self::S3Bucket => "S3Bucket",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
