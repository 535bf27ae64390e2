// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-node desired-state compilation.
//!
//! [`DesiredStateCompiler::get_for_node`] resolves the node's shard and runs
//! the single loader for the shard's role. The document is built entirely
//! or not at all: any failed sub-query fails the whole call with
//! [`CoreError::PartialFailure`], since agents apply it as one unit.
//!
//! Included statuses:
//!
//! | collection            | statuses                  |
//! |-----------------------|---------------------------|
//! | tenants               | active, suspended         |
//! | webroots, fqdns, keys | active                    |
//! | cron jobs             | active, auto_disabled     |
//! | daemons               | active                    |
//! | databases, valkey, s3 | active (users: active)    |
//! | lb mappings           | fqdn active, tenant active or suspended |

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::model::{
    DesiredCronJob, DesiredDaemon, DesiredDatabase, DesiredDatabaseUser, DesiredFqdn,
    DesiredS3Bucket, DesiredSshKey, DesiredState, DesiredTenant, DesiredValkeyInstance,
    DesiredValkeyUser, DesiredWebroot, ResourceStatus, RoleState, ShardRecord, ShardRole,
    TenantRecord, WebrootRecord,
};
use crate::store::ResourceStore;

use ResourceStatus::{Active, AutoDisabled, Suspended};

const VISIBLE_TENANTS: &[ResourceStatus] = &[Active, Suspended];
const VISIBLE_CRON_JOBS: &[ResourceStatus] = &[Active, AutoDisabled];
const ACTIVE: &[ResourceStatus] = &[Active];

/// Read-only projection of the store into per-node documents.
#[derive(Clone)]
pub struct DesiredStateCompiler {
    store: Arc<dyn ResourceStore>,
}

impl DesiredStateCompiler {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Compile the desired state of `node_id`.
    ///
    /// Fails with `NotFound` when the node, its shard assignment or the
    /// shard is missing, and with `Validation` for a role without a loader.
    pub async fn get_for_node(&self, node_id: &str) -> Result<DesiredState> {
        let node = self
            .store
            .get_node(node_id)
            .await?
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        let shard_id = node
            .shard_id
            .ok_or_else(|| CoreError::not_found("shard", format!("(none for node {})", node_id)))?;
        let shard = self
            .store
            .get_shard(&shard_id)
            .await?
            .ok_or_else(|| CoreError::not_found("shard", &shard_id))?;

        let role = match shard.role {
            ShardRole::Web => self.load_web(node_id, &shard).await?,
            ShardRole::Database => self.load_database(node_id, &shard).await?,
            ShardRole::Valkey => self.load_valkey(node_id, &shard).await?,
            ShardRole::Lb => self.load_lb(node_id, &shard).await?,
            ShardRole::Storage => self.load_storage(node_id, &shard).await?,
            other => {
                warn!(node_id = %node_id, shard_id = %shard.id, role = %other, "No desired state for shard role");
                return Err(CoreError::validation(
                    "shard_role",
                    format!("shard role '{}' has no desired state", other),
                ));
            }
        };

        debug!(node_id = %node_id, shard_id = %shard.id, role = %shard.role, "Desired state compiled");
        Ok(DesiredState {
            node_id: node_id.to_string(),
            shard_id: shard.id,
            role,
        })
    }

    async fn load_web(&self, node_id: &str, shard: &ShardRecord) -> Result<RoleState> {
        let tenants = self
            .store
            .list_tenants_on_shard(&shard.id, VISIBLE_TENANTS)
            .await
            .map_err(partial(node_id, "tenants"))?;

        let mut desired = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            desired.push(self.load_tenant(node_id, tenant).await?);
        }
        Ok(RoleState::Web { tenants: desired })
    }

    async fn load_tenant(&self, node_id: &str, tenant: TenantRecord) -> Result<DesiredTenant> {
        let webroots = self
            .store
            .list_webroots(&tenant.id, ACTIVE)
            .await
            .map_err(partial(node_id, "webroots"))?;
        let mut desired_webroots = Vec::with_capacity(webroots.len());
        for webroot in webroots {
            desired_webroots.push(self.load_webroot(node_id, webroot).await?);
        }

        let ssh_keys = self
            .store
            .list_ssh_keys(&tenant.id, ACTIVE)
            .await
            .map_err(partial(node_id, "ssh_keys"))?
            .into_iter()
            .map(|k| DesiredSshKey {
                id: k.id,
                name: k.name,
                public_key: k.public_key,
            })
            .collect();

        Ok(DesiredTenant {
            id: tenant.id,
            name: tenant.name,
            uid: tenant.uid,
            sftp_enabled: tenant.sftp_enabled,
            ssh_enabled: tenant.ssh_enabled,
            status: tenant.status,
            webroots: desired_webroots,
            ssh_keys,
        })
    }

    async fn load_webroot(&self, node_id: &str, webroot: WebrootRecord) -> Result<DesiredWebroot> {
        let runtime_config = serde_json::from_str(&webroot.runtime_config).map_err(|e| {
            CoreError::PartialFailure {
                node_id: node_id.to_string(),
                stage: "runtime_config".to_string(),
                details: format!("webroot '{}': {}", webroot.id, e),
            }
        })?;

        let env_vars = self
            .store
            .list_env_vars(&webroot.id)
            .await
            .map_err(partial(node_id, "env_vars"))?
            .into_iter()
            .map(|v| (v.name, v.value))
            .collect();

        let fqdns = self
            .store
            .list_fqdns(&webroot.id, ACTIVE)
            .await
            .map_err(partial(node_id, "fqdns"))?
            .into_iter()
            .map(|f| DesiredFqdn {
                fqdn: f.fqdn,
                ssl_enabled: f.ssl_enabled,
                status: f.status,
            })
            .collect();

        let cron_jobs = self
            .store
            .list_cron_jobs(&webroot.id, VISIBLE_CRON_JOBS)
            .await
            .map_err(partial(node_id, "cron_jobs"))?
            .into_iter()
            .map(|c| DesiredCronJob {
                id: c.id,
                name: c.name,
                schedule: c.schedule,
                command: c.command,
                working_directory: c.working_directory,
                timeout_seconds: c.timeout_seconds,
                enabled: c.enabled,
                status: c.status,
            })
            .collect();

        let daemons = self
            .store
            .list_daemons(&webroot.id, ACTIVE)
            .await
            .map_err(partial(node_id, "daemons"))?
            .into_iter()
            .map(|d| DesiredDaemon {
                id: d.id,
                node_id: d.node_id,
                name: d.name,
                command: d.command,
                num_procs: d.num_procs,
                enabled: d.enabled,
                proxy_path: d.proxy_path,
                proxy_port: d.proxy_port,
            })
            .collect();

        Ok(DesiredWebroot {
            id: webroot.id,
            name: webroot.name,
            runtime: webroot.runtime,
            runtime_version: webroot.runtime_version,
            runtime_config,
            public_folder: webroot.public_folder,
            env_file_name: webroot.env_file_name,
            env_vars,
            status: webroot.status,
            fqdns,
            cron_jobs,
            daemons,
        })
    }

    async fn load_database(&self, node_id: &str, shard: &ShardRecord) -> Result<RoleState> {
        let databases = self
            .store
            .list_databases(&shard.id, ACTIVE)
            .await
            .map_err(partial(node_id, "databases"))?;

        let mut desired = Vec::with_capacity(databases.len());
        for database in databases {
            let users = self
                .store
                .list_database_users(&database.id, ACTIVE)
                .await
                .map_err(partial(node_id, "database_users"))?
                .into_iter()
                .map(|u| DesiredDatabaseUser {
                    id: u.id,
                    username: u.username,
                    password: u.password,
                    privileges: u.privileges,
                    status: u.status,
                })
                .collect();
            desired.push(DesiredDatabase {
                id: database.id,
                name: database.name,
                status: database.status,
                users,
            });
        }
        Ok(RoleState::Database { databases: desired })
    }

    async fn load_valkey(&self, node_id: &str, shard: &ShardRecord) -> Result<RoleState> {
        let instances = self
            .store
            .list_valkey_instances(&shard.id, ACTIVE)
            .await
            .map_err(partial(node_id, "valkey_instances"))?;

        let mut desired = Vec::with_capacity(instances.len());
        for instance in instances {
            let users = self
                .store
                .list_valkey_users(&instance.id, ACTIVE)
                .await
                .map_err(partial(node_id, "valkey_users"))?
                .into_iter()
                .map(|u| DesiredValkeyUser {
                    id: u.id,
                    username: u.username,
                    password: u.password,
                    privileges: u.privileges,
                    key_pattern: u.key_pattern,
                    status: u.status,
                })
                .collect();
            desired.push(DesiredValkeyInstance {
                id: instance.id,
                name: instance.name,
                port: instance.port,
                password: instance.password,
                max_memory_mb: instance.max_memory_mb,
                status: instance.status,
                users,
            });
        }
        Ok(RoleState::Valkey {
            valkey_instances: desired,
        })
    }

    /// Routing table for every web shard in the LB shard's cluster.
    async fn load_lb(&self, node_id: &str, shard: &ShardRecord) -> Result<RoleState> {
        let fqdn_mappings = self
            .store
            .list_fqdn_mappings(&shard.cluster_id, ACTIVE, VISIBLE_TENANTS)
            .await
            .map_err(partial(node_id, "fqdn_mappings"))?;
        Ok(RoleState::Lb { fqdn_mappings })
    }

    async fn load_storage(&self, node_id: &str, shard: &ShardRecord) -> Result<RoleState> {
        let s3_buckets = self
            .store
            .list_s3_buckets(&shard.id, ACTIVE)
            .await
            .map_err(partial(node_id, "s3_buckets"))?
            .into_iter()
            .map(|b| DesiredS3Bucket {
                id: b.id,
                name: b.name,
                tenant_id: b.tenant_id,
                public: b.public,
                quota_bytes: b.quota_bytes,
                status: b.status,
            })
            .collect();
        Ok(RoleState::Storage { s3_buckets })
    }
}

fn partial(node_id: &str, stage: &'static str) -> impl FnOnce(CoreError) -> CoreError {
    let node_id = node_id.to_string();
    move |err| {
        warn!(node_id = %node_id, stage, error = %err, "Desired state sub-query failed");
        CoreError::PartialFailure {
            node_id,
            stage: stage.to_string(),
            details: err.to_string(),
        }
    }
}
