// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shards and nodes. Registered by operators, not provisioned by workflows.

use serde::Deserialize;
use tracing::info;

use super::{Lifecycle, new_id, now};
use crate::error::{CoreError, Result};
use crate::model::{NodeRecord, ShardRecord, ShardRole};
use crate::validate;

/// Node statuses accepted by [`InfraService::set_node_status`].
const NODE_STATUSES: &[&str] = &["active", "draining", "inactive"];

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShard {
    pub cluster_id: String,
    pub name: String,
    pub role: ShardRole,
    pub lb_backend: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNode {
    pub cluster_id: String,
    pub hostname: String,
    pub shard_id: Option<String>,
}

#[derive(Clone)]
pub struct InfraService {
    lifecycle: Lifecycle,
}

impl InfraService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn create_shard(&self, req: CreateShard) -> Result<ShardRecord> {
        validate::required("cluster_id", &req.cluster_id)?;
        validate::name("name", &req.name)?;
        if let Some(backend) = &req.lb_backend {
            validate::required("lb_backend", backend)?;
        }

        let shard = ShardRecord {
            id: new_id(),
            cluster_id: req.cluster_id,
            name: req.name,
            role: req.role,
            lb_backend: req.lb_backend,
            status: "active".to_string(),
            created_at: now(),
        };
        self.lifecycle.store().insert_shard(&shard).await?;
        info!(shard_id = %shard.id, role = %shard.role, "Shard registered");
        Ok(shard)
    }

    pub async fn get_shard(&self, id: &str) -> Result<ShardRecord> {
        self.lifecycle
            .store()
            .get_shard(id)
            .await?
            .ok_or_else(|| CoreError::not_found("shard", id))
    }

    pub async fn list_shards(&self) -> Result<Vec<ShardRecord>> {
        self.lifecycle.store().list_shards().await
    }

    /// Register a node. A node joining a shard must be in the shard's cluster.
    pub async fn create_node(&self, req: CreateNode) -> Result<NodeRecord> {
        validate::required("cluster_id", &req.cluster_id)?;
        validate::required("hostname", &req.hostname)?;
        if let Some(shard_id) = &req.shard_id {
            let shard = self.get_shard(shard_id).await?;
            if shard.cluster_id != req.cluster_id {
                return Err(CoreError::validation(
                    "shard_id",
                    format!(
                        "shard '{}' belongs to cluster '{}'",
                        shard_id, shard.cluster_id
                    ),
                ));
            }
        }

        let node = NodeRecord {
            id: new_id(),
            cluster_id: req.cluster_id,
            hostname: req.hostname,
            shard_id: req.shard_id,
            status: "active".to_string(),
            created_at: now(),
        };
        self.lifecycle.store().insert_node(&node).await?;
        info!(node_id = %node.id, hostname = %node.hostname, "Node registered");
        Ok(node)
    }

    pub async fn get_node(&self, id: &str) -> Result<NodeRecord> {
        self.lifecycle
            .store()
            .get_node(id)
            .await?
            .ok_or_else(|| CoreError::not_found("node", id))
    }

    pub async fn list_nodes(&self, shard_id: &str) -> Result<Vec<NodeRecord>> {
        self.lifecycle.store().list_nodes(shard_id).await
    }

    /// Only `active` nodes receive new daemons.
    pub async fn set_node_status(&self, id: &str, status: &str) -> Result<()> {
        if !NODE_STATUSES.contains(&status) {
            return Err(CoreError::validation(
                "status",
                format!("must be one of {}", NODE_STATUSES.join(", ")),
            ));
        }
        if !self.lifecycle.store().set_node_status(id, status).await? {
            return Err(CoreError::not_found("node", id));
        }
        info!(node_id = %id, status, "Node status changed");
        Ok(())
    }
}
