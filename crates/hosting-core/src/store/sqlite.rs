// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite resource store for embedded deployments and tests.

use std::path::Path;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use super::queries::sql_resource_store;
use crate::error::CoreError;
use crate::migrations;

/// SQLite-backed [`ResourceStore`](super::ResourceStore).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a store from a file path.
    ///
    /// Creates parent directories and the database file if missing, then
    /// runs all migrations.
    ///
    /// ```ignore
    /// let store = SqliteStore::from_path(".data/hosting.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Persistence {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| CoreError::Persistence {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        Self::migrated(pool).await
    }

    /// Create a private in-memory store with the schema applied.
    ///
    /// Uses a single connection so every query sees the same database.
    pub async fn in_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(CoreError::persistence("connect"))?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, CoreError> {
        migrations::run_sqlite(&pool)
            .await
            .map_err(|e| CoreError::Persistence {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;
        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

sql_resource_store!(SqliteStore, sqlx::Sqlite);
