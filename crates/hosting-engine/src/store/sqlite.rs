// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite outbox store for embedded deployments and tests.

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use super::queries::sql_outbox_store;
use crate::error::{OutboxError, Result};
use crate::migrations;

/// SQLite-backed [`OutboxStore`](super::OutboxStore).
#[derive(Clone)]
pub struct SqliteOutboxStore {
    pool: SqlitePool,
}

impl SqliteOutboxStore {
    /// Create a store on a pool that already has the engine migrations applied.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a private in-memory database with core and engine schemas.
    ///
    /// The pool is a single connection kept open for the pool's lifetime;
    /// share it with a `hosting_core::store::SqliteStore` through [`pool`](Self::pool).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(OutboxError::database("connect"))?;
        migrations::run_sqlite(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

sql_outbox_store!(SqliteOutboxStore, sqlx::Sqlite);
