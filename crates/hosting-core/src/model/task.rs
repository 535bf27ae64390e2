// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// A unit of provisioning work handed from a lifecycle service to the
/// dispatcher. Immutable; lives for a single dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionTask {
    /// Workflow type the entity execution starts, e.g. `CreateWebrootWorkflow`.
    pub workflow_name: String,
    /// Deterministic ID of the logical operation. Idempotency key for the engine.
    pub workflow_id: String,
    /// Workflow argument, opaque to the dispatcher.
    pub arg: serde_json::Value,
    pub resource_type: String,
    pub resource_id: String,
}
