// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL resource store.

use sqlx::PgPool;

use super::queries::sql_resource_store;

/// PostgreSQL-backed [`ResourceStore`](super::ResourceStore).
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

sql_resource_store!(PostgresStore, sqlx::Postgres);
