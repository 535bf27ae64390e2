// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node selection and port allocation at resource-creation time.

use std::sync::Arc;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::store::ResourceStore;

/// First port handed out on a shard without valkey instances.
pub const VALKEY_PORT_FLOOR: i32 = 6380;
/// Daemon ports fall in `[DAEMON_PORT_BASE, DAEMON_PORT_BASE + DAEMON_PORT_RANGE)`.
pub const DAEMON_PORT_BASE: u32 = 10000;
pub const DAEMON_PORT_RANGE: u32 = 10000;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Stateless daemon port: `10000 + fnv1a32("{tenant}/{webroot}/{daemon}") % 10000`.
///
/// Stable for the same triple. Collisions are not detected.
pub fn compute_daemon_port(tenant: &str, webroot: &str, daemon: &str) -> i32 {
    let key = format!("{}/{}/{}", tenant, webroot, daemon);
    (DAEMON_PORT_BASE + fnv1a32(key.as_bytes()) % DAEMON_PORT_RANGE) as i32
}

/// Store-backed allocators.
#[derive(Clone)]
pub struct Placement {
    store: Arc<dyn ResourceStore>,
}

impl Placement {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Node for a new daemon of `tenant_id`.
    ///
    /// Picks the active node of the tenant's shard with the fewest daemons,
    /// lowest node ID on ties. `None` when the tenant has no shard or the
    /// shard has no active node; the daemon is then created unassigned.
    pub async fn daemon_node(&self, tenant_id: &str) -> Result<Option<String>> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| CoreError::not_found("tenant", tenant_id))?;

        let Some(shard_id) = tenant.shard_id else {
            debug!(tenant_id = %tenant_id, "Tenant has no shard, daemon left unassigned");
            return Ok(None);
        };

        let node = self.store.least_loaded_node(&shard_id).await?;
        debug!(tenant_id = %tenant_id, shard_id = %shard_id, node_id = ?node, "Daemon node selected");
        Ok(node)
    }

    /// Next valkey port on a shard. Ports of deleted instances are not reused.
    pub async fn valkey_port(&self, shard_id: &str) -> Result<i32> {
        let port = self.store.next_valkey_port(shard_id).await?;
        Ok(port.max(VALKEY_PORT_FLOOR))
    }
}
