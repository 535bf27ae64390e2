// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL outbox store.

use sqlx::PgPool;

use super::queries::sql_outbox_store;

/// PostgreSQL-backed [`OutboxStore`](super::OutboxStore).
#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    /// Create a store on a pool that already has the engine migrations applied.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

sql_outbox_store!(PgOutboxStore, sqlx::Postgres);
