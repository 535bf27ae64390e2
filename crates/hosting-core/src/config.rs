// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dispatch configuration for hosting-core.

/// Default task queue shared by every provisioning workflow.
pub const DEFAULT_TASK_QUEUE: &str = "hosting-tasks";
/// Default workflow type of the per-tenant entity execution.
pub const DEFAULT_ENTITY_WORKFLOW: &str = "TenantProvisionWorkflow";
/// Default signal name carrying a provision task.
pub const DEFAULT_PROVISION_SIGNAL: &str = "provision";

/// Dispatch settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Task queue the entity executions and unscoped workflows run on.
    pub task_queue: String,
    /// Workflow type started for a tenant that has no running execution.
    pub entity_workflow: String,
    /// Signal name used to enqueue a task into the entity execution.
    pub provision_signal: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            entity_workflow: DEFAULT_ENTITY_WORKFLOW.to_string(),
            provision_signal: DEFAULT_PROVISION_SIGNAL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HOSTING_TASK_QUEUE` (default: `hosting-tasks`)
    /// - `HOSTING_ENTITY_WORKFLOW` (default: `TenantProvisionWorkflow`)
    /// - `HOSTING_PROVISION_SIGNAL` (default: `provision`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            task_queue: non_empty_var("HOSTING_TASK_QUEUE", DEFAULT_TASK_QUEUE)?,
            entity_workflow: non_empty_var("HOSTING_ENTITY_WORKFLOW", DEFAULT_ENTITY_WORKFLOW)?,
            provision_signal: non_empty_var("HOSTING_PROVISION_SIGNAL", DEFAULT_PROVISION_SIGNAL)?,
        })
    }
}

fn non_empty_var(key: &'static str, default: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Invalid(key, "must not be empty")),
        Ok(value) => Ok(value),
        Err(_) => Ok(default.to_string()),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    /// An environment variable holds an unusable value.
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
