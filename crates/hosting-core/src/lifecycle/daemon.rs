// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;
use tracing::debug;

use super::{Lifecycle, Resource, new_id, now};
use crate::error::{CoreError, Result};
use crate::model::{DaemonRecord, ResourceKind, ResourceStatus};
use crate::placement::{Placement, compute_daemon_port};
use crate::validate;

impl Resource for DaemonRecord {
    const KIND: ResourceKind = ResourceKind::Daemon;

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
pub struct CreateDaemon {
    pub webroot_id: String,
    pub name: String,
    pub command: String,
    /// URL prefix routed to the daemon. Without an explicit port one is
    /// derived from the tenant, webroot and daemon names.
    pub proxy_path: Option<String>,
    pub proxy_port: Option<i32>,
    #[serde(default = "default_num_procs")]
    pub num_procs: i32,
}

fn default_num_procs() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDaemon {
    pub command: Option<String>,
    pub proxy_path: Option<String>,
    pub proxy_port: Option<i32>,
    pub num_procs: Option<i32>,
}

#[derive(Clone)]
pub struct DaemonService {
    lifecycle: Lifecycle,
    placement: Placement,
}

impl DaemonService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        let placement = Placement::new(lifecycle.store().clone());
        Self {
            lifecycle,
            placement,
        }
    }

    /// Create a daemon on the least loaded node of its tenant's shard.
    pub async fn create(&self, req: CreateDaemon) -> Result<DaemonRecord> {
        validate::name("name", &req.name)?;
        validate::required("command", &req.command)?;
        validate::positive("num_procs", req.num_procs)?;
        if let Some(path) = &req.proxy_path {
            validate::proxy_path("proxy_path", path)?;
        }
        if let Some(port) = req.proxy_port {
            validate::positive("proxy_port", port)?;
        }

        let store = self.lifecycle.store();
        let webroot = store
            .get_webroot(&req.webroot_id)
            .await?
            .ok_or_else(|| CoreError::not_found("webroot", &req.webroot_id))?;

        let node_id = self.placement.daemon_node(&webroot.tenant_id).await?;
        let proxy_port = match (&req.proxy_path, req.proxy_port) {
            (Some(_), None) => {
                let port = self
                    .derived_port(&webroot.tenant_id, &webroot.name, &req.name)
                    .await?;
                debug!(daemon = %req.name, port, "Derived daemon proxy port");
                Some(port)
            }
            (_, port) => port,
        };

        let created_at = now();
        let daemon = DaemonRecord {
            id: new_id(),
            tenant_id: webroot.tenant_id,
            webroot_id: webroot.id,
            node_id,
            name: req.name,
            command: req.command,
            proxy_path: req.proxy_path,
            proxy_port,
            num_procs: req.num_procs,
            enabled: true,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_daemon(&daemon).await?;

        self.lifecycle.created(&daemon).await?;
        Ok(daemon)
    }

    pub async fn get(&self, id: &str) -> Result<DaemonRecord> {
        self.lifecycle
            .store()
            .get_daemon(id)
            .await?
            .ok_or_else(|| CoreError::not_found("daemon", id))
    }

    pub async fn list(&self, webroot_id: &str) -> Result<Vec<DaemonRecord>> {
        self.lifecycle.store().list_daemons(webroot_id, &[]).await
    }

    pub async fn update(&self, id: &str, req: UpdateDaemon) -> Result<DaemonRecord> {
        let mut daemon = self.get(id).await?;
        Lifecycle::check_updatable(&daemon)?;

        if let Some(command) = req.command {
            validate::required("command", &command)?;
            daemon.command = command;
        }
        if let Some(path) = req.proxy_path {
            validate::proxy_path("proxy_path", &path)?;
            daemon.proxy_path = Some(path);
        }
        if let Some(port) = req.proxy_port {
            validate::positive("proxy_port", port)?;
            daemon.proxy_port = Some(port);
        }
        if let Some(num_procs) = req.num_procs {
            validate::positive("num_procs", num_procs)?;
            daemon.num_procs = num_procs;
        }
        if daemon.proxy_path.is_some() && daemon.proxy_port.is_none() {
            let webroot = self
                .lifecycle
                .store()
                .get_webroot(&daemon.webroot_id)
                .await?
                .ok_or_else(|| CoreError::not_found("webroot", &daemon.webroot_id))?;
            daemon.proxy_port = Some(
                self.derived_port(&daemon.tenant_id, &webroot.name, &daemon.name)
                    .await?,
            );
        }

        if !self.lifecycle.store().update_daemon(&daemon).await? {
            return Err(CoreError::not_found("daemon", id));
        }
        self.lifecycle.updated(&daemon).await?;
        Ok(daemon)
    }

    /// Proxy port hashed from the tenant's name.
    async fn derived_port(&self, tenant_id: &str, webroot: &str, daemon: &str) -> Result<i32> {
        let tenant = self
            .lifecycle
            .store()
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| CoreError::not_found("tenant", tenant_id))?;
        Ok(compute_daemon_port(&tenant.name, webroot, daemon))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let daemon = self.get(id).await?;
        self.lifecycle.delete(&daemon).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let daemon = self.get(id).await?;
        self.lifecycle.retry(&daemon).await
    }

    pub async fn enable(&self, id: &str) -> Result<()> {
        let daemon = self.get(id).await?;
        self.lifecycle
            .enable(&daemon, &[ResourceStatus::Active])
            .await
    }

    pub async fn disable(&self, id: &str) -> Result<()> {
        let daemon = self.get(id).await?;
        self.lifecycle.disable(&daemon).await
    }
}
