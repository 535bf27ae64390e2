// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for hosting-core integration tests.
//!
//! Every test gets a private in-memory SQLite store and a recording
//! [`MockEngine`], wired into a full [`Services`] bundle.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use hosting_core::Config;
use hosting_core::engine::MockEngine;
use hosting_core::lifecycle::{
    CreateCronJob, CreateFqdn, CreateNode, CreateShard, CreateTenant, CreateWebroot,
    ProvisionOutcome,
};
use hosting_core::model::{
    CronJobRecord, FqdnRecord, NodeRecord, ResourceKind, ShardRecord, ShardRole, TenantRecord,
    WebrootRecord,
};
use hosting_core::services::Services;
use hosting_core::store::{ResourceStore, SqliteStore};

pub const CLUSTER: &str = "cluster-1";

/// Store, engine and services for one test.
pub struct TestContext {
    pub store: Arc<SqliteStore>,
    pub engine: MockEngine,
    pub services: Services,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(
            SqliteStore::in_memory()
                .await
                .expect("Failed to create in-memory store"),
        );
        let engine = MockEngine::new();
        let services = Services::new(
            store.clone() as Arc<dyn ResourceStore>,
            Arc::new(engine.clone()),
            Config::default(),
        );
        Self {
            store,
            engine,
            services,
        }
    }

    /// Mark a resource as converged, as a successful workflow would.
    pub async fn activate(&self, kind: ResourceKind, id: &str) {
        self.services
            .lifecycle
            .report_outcome(kind, id, ProvisionOutcome::Active)
            .await
            .expect("Failed to activate resource");
    }

    pub async fn fail(&self, kind: ResourceKind, id: &str, message: &str) {
        self.services
            .lifecycle
            .report_outcome(kind, id, ProvisionOutcome::Failed(message.to_string()))
            .await
            .expect("Failed to fail resource");
    }

    pub async fn shard(&self, name: &str, role: ShardRole) -> ShardRecord {
        self.shard_in(CLUSTER, name, role).await
    }

    pub async fn shard_in(&self, cluster: &str, name: &str, role: ShardRole) -> ShardRecord {
        let lb_backend = (role == ShardRole::Web).then(|| format!("{}.backend:80", name));
        self.services
            .infra
            .create_shard(CreateShard {
                cluster_id: cluster.to_string(),
                name: name.to_string(),
                role,
                lb_backend,
            })
            .await
            .expect("Failed to create shard")
    }

    pub async fn node(&self, shard: &ShardRecord, hostname: &str) -> NodeRecord {
        self.services
            .infra
            .create_node(CreateNode {
                cluster_id: shard.cluster_id.clone(),
                hostname: hostname.to_string(),
                shard_id: Some(shard.id.clone()),
            })
            .await
            .expect("Failed to create node")
    }

    /// Pending tenant on `shard`.
    pub async fn tenant(&self, name: &str, shard: Option<&ShardRecord>) -> TenantRecord {
        self.services
            .tenants
            .create(CreateTenant {
                name: name.to_string(),
                shard_id: shard.map(|s| s.id.clone()),
                sftp_enabled: true,
                ssh_enabled: false,
            })
            .await
            .expect("Failed to create tenant")
    }

    pub async fn active_tenant(&self, name: &str, shard: &ShardRecord) -> TenantRecord {
        let tenant = self.tenant(name, Some(shard)).await;
        self.activate(ResourceKind::Tenant, &tenant.id).await;
        tenant
    }

    pub async fn webroot(&self, tenant: &TenantRecord, name: &str) -> WebrootRecord {
        let mut env_vars = BTreeMap::new();
        env_vars.insert("APP_ENV".to_string(), "production".to_string());
        self.services
            .webroots
            .create(CreateWebroot {
                tenant_id: tenant.id.clone(),
                name: name.to_string(),
                runtime: "php".to_string(),
                runtime_version: "8.3".to_string(),
                runtime_config: serde_json::json!({"memory_limit": "256M"}),
                public_folder: "public".to_string(),
                env_file_name: ".env".to_string(),
                env_vars,
            })
            .await
            .expect("Failed to create webroot")
    }

    pub async fn active_webroot(&self, tenant: &TenantRecord, name: &str) -> WebrootRecord {
        let webroot = self.webroot(tenant, name).await;
        self.activate(ResourceKind::Webroot, &webroot.id).await;
        webroot
    }

    pub async fn fqdn(&self, webroot: &WebrootRecord, fqdn: &str) -> FqdnRecord {
        self.services
            .fqdns
            .create(CreateFqdn {
                webroot_id: webroot.id.clone(),
                fqdn: fqdn.to_string(),
                ssl_enabled: true,
            })
            .await
            .expect("Failed to create fqdn")
    }

    pub async fn cron_job(
        &self,
        webroot: &WebrootRecord,
        name: &str,
        max_failures: i32,
    ) -> CronJobRecord {
        self.services
            .cron_jobs
            .create(CreateCronJob {
                webroot_id: webroot.id.clone(),
                name: name.to_string(),
                schedule: "*/5 * * * *".to_string(),
                command: "php artisan schedule:run".to_string(),
                working_directory: String::new(),
                timeout_seconds: None,
                max_failures,
                enabled: true,
            })
            .await
            .expect("Failed to create cron job")
    }

    pub async fn active_cron_job(
        &self,
        webroot: &WebrootRecord,
        name: &str,
        max_failures: i32,
    ) -> CronJobRecord {
        let job = self.cron_job(webroot, name, max_failures).await;
        self.activate(ResourceKind::CronJob, &job.id).await;
        job
    }
}
