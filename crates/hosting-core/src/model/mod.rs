// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain model: lifecycle statuses, shard roles, resource records and the
//! values exchanged with the dispatcher and the convergence agents.

mod desired_state;
mod kind;
mod records;
mod task;

pub use self::desired_state::*;
pub use self::kind::ResourceKind;
pub use self::records::*;
pub use self::task::ProvisionTask;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status carried by every resource row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Provisioning,
    Active,
    Suspended,
    Failed,
    Deleting,
    /// Cron jobs only.
    AutoDisabled,
}

impl ResourceStatus {
    pub const ALL: [ResourceStatus; 7] = [
        ResourceStatus::Pending,
        ResourceStatus::Provisioning,
        ResourceStatus::Active,
        ResourceStatus::Suspended,
        ResourceStatus::Failed,
        ResourceStatus::Deleting,
        ResourceStatus::AutoDisabled,
    ];

    /// Store and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Failed => "failed",
            Self::Deleting => "deleting",
            Self::AutoDisabled => "auto_disabled",
        }
    }

    /// Render a guard set for error messages: `'active' or 'failed'`.
    pub fn describe(statuses: &[ResourceStatus]) -> String {
        statuses
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ResourceStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResourceStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or(UnknownVariant {
                what: "resource status",
                value,
            })
    }
}

/// Role of a shard. Only some roles have a desired-state loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardRole {
    Web,
    Database,
    Valkey,
    Lb,
    Storage,
    Dns,
    Email,
    Dbadmin,
    Gateway,
}

impl ShardRole {
    pub const ALL: [ShardRole; 9] = [
        ShardRole::Web,
        ShardRole::Database,
        ShardRole::Valkey,
        ShardRole::Lb,
        ShardRole::Storage,
        ShardRole::Dns,
        ShardRole::Email,
        ShardRole::Dbadmin,
        ShardRole::Gateway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Database => "database",
            Self::Valkey => "valkey",
            Self::Lb => "lb",
            Self::Storage => "storage",
            Self::Dns => "dns",
            Self::Email => "email",
            Self::Dbadmin => "dbadmin",
            Self::Gateway => "gateway",
        }
    }
}

impl fmt::Display for ShardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ShardRole {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ShardRole::ALL
            .into_iter()
            .find(|r| r.as_str() == value)
            .ok_or(UnknownVariant {
                what: "shard role",
                value,
            })
    }
}

/// A stored string that matches no enum variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct UnknownVariant {
    what: &'static str,
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_store_text() {
        for status in ResourceStatus::ALL {
            let parsed = ResourceStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(parsed, status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
        assert!(ResourceStatus::try_from("archived".to_string()).is_err());
    }

    #[test]
    fn test_describe_guard_set() {
        assert_eq!(
            ResourceStatus::describe(&[ResourceStatus::Active, ResourceStatus::AutoDisabled]),
            "'active' or 'auto_disabled'"
        );
    }

    #[test]
    fn test_shard_role_parse() {
        assert_eq!(ShardRole::try_from("lb".to_string()).unwrap(), ShardRole::Lb);
        let err = ShardRole::try_from("mail".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "unknown shard role 'mail'");
    }
}
