// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker configuration for hosting-engine.

use std::time::Duration;

use hosting_core::config::ConfigError;

/// Engine settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Prefix of the worker IDs recorded as `claimed_by`.
    pub worker_id: String,
    /// Sleep between polls when no execution was claimable.
    pub poll_interval: Duration,
    /// How long a claim stays valid without renewal.
    pub lease: Duration,
    /// Number of concurrent workers.
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_id: random_worker_id(),
            poll_interval: Duration::from_millis(500),
            lease: Duration::from_secs(60),
            workers: 4,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HOSTING_ENGINE_WORKER_ID` (default: random)
    /// - `HOSTING_ENGINE_POLL_INTERVAL_MS` (default: 500)
    /// - `HOSTING_ENGINE_LEASE_SECS` (default: 60)
    /// - `HOSTING_ENGINE_WORKERS` (default: 4)
    pub fn from_env() -> Result<Self, ConfigError> {
        let worker_id = match std::env::var("HOSTING_ENGINE_WORKER_ID") {
            Ok(id) if id.trim().is_empty() => {
                return Err(ConfigError::Invalid(
                    "HOSTING_ENGINE_WORKER_ID",
                    "must not be empty",
                ));
            }
            Ok(id) => id,
            Err(_) => random_worker_id(),
        };

        let poll_ms = positive_var("HOSTING_ENGINE_POLL_INTERVAL_MS", 500)?;
        let lease_secs = positive_var("HOSTING_ENGINE_LEASE_SECS", 60)?;
        let workers = positive_var("HOSTING_ENGINE_WORKERS", 4)?;

        Ok(Self {
            worker_id,
            poll_interval: Duration::from_millis(poll_ms),
            lease: Duration::from_secs(lease_secs),
            workers: usize::try_from(workers)
                .map_err(|_| ConfigError::Invalid("HOSTING_ENGINE_WORKERS", "too large"))?,
        })
    }
}

/// Outbox retention settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Whether the retention worker runs.
    pub enabled: bool,
    /// How often to prune.
    pub poll_interval: Duration,
    /// Age after which processed signals and closed executions are deleted.
    pub max_age: Duration,
    /// Rows deleted per statement.
    pub batch_size: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(3600),  // 1 hour
            max_age: Duration::from_secs(7 * 24 * 3600), // 7 days
            batch_size: 500,
        }
    }
}

impl RetentionConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HOSTING_ENGINE_RETENTION_ENABLED`: "true"/"1" or "false"/"0" (default: true)
    /// - `HOSTING_ENGINE_RETENTION_POLL_INTERVAL_SECS` (default: 3600)
    /// - `HOSTING_ENGINE_RETENTION_MAX_AGE_HOURS` (default: 168)
    /// - `HOSTING_ENGINE_RETENTION_BATCH_SIZE` (default: 500)
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled = match std::env::var("HOSTING_ENGINE_RETENTION_ENABLED") {
            Ok(value) => match value.trim() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::Invalid(
                        "HOSTING_ENGINE_RETENTION_ENABLED",
                        "must be true, false, 1 or 0",
                    ));
                }
            },
            Err(_) => true,
        };

        let poll_secs = positive_var("HOSTING_ENGINE_RETENTION_POLL_INTERVAL_SECS", 3600)?;
        let max_age_hours = positive_var("HOSTING_ENGINE_RETENTION_MAX_AGE_HOURS", 168)?;
        let batch_size = positive_var("HOSTING_ENGINE_RETENTION_BATCH_SIZE", 500)?;

        Ok(Self {
            enabled,
            poll_interval: Duration::from_secs(poll_secs),
            max_age: Duration::from_secs(max_age_hours.saturating_mul(3600)),
            batch_size: i64::try_from(batch_size).map_err(|_| {
                ConfigError::Invalid("HOSTING_ENGINE_RETENTION_BATCH_SIZE", "too large")
            })?,
        })
    }
}

fn random_worker_id() -> String {
    format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

fn positive_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::Invalid(key, "must be greater than zero")),
            Ok(n) => Ok(n),
            Err(_) => Err(ConfigError::Invalid(key, "must be a positive integer")),
        },
        Err(_) => Ok(default),
    }
}
