// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database migrations for hosting-engine.
//!
//! The engine extends the hosting-core schema with the outbox tables
//! (`entity_executions`, `provision_signals`). Calling [`run_postgres`] or
//! [`run_sqlite`] applies core and engine migrations as one set, so SQLx
//! sees a single ordered history.
//!
//! ```ignore
//! let pool = PgPool::connect(&database_url).await?;
//! hosting_engine::migrations::run_postgres(&pool).await?;
//! ```

use std::borrow::Cow;

use sqlx::migrate::{MigrateError, Migration, Migrator};

/// Engine migrations. Versions start at 20250315000000 so they sort after
/// the core resource tables.
static ENGINE_POSTGRES: Migrator = sqlx::migrate!("./migrations/postgresql");
static ENGINE_SQLITE: Migrator = sqlx::migrate!("./migrations/sqlite");

/// Migration source merging a core migrator with an engine migrator.
#[derive(Debug)]
struct CombinedMigrations {
    core: &'static Migrator,
    engine: &'static Migrator,
}

impl<'s> sqlx::migrate::MigrationSource<'s> for CombinedMigrations {
    fn resolve(
        self,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<
                    Output = Result<Vec<Migration>, Box<dyn std::error::Error + Send + Sync>>,
                > + Send
                + 's,
        >,
    > {
        Box::pin(async move {
            let mut all: Vec<Migration> = self.core.iter().cloned().collect();
            all.extend(self.engine.iter().cloned());
            all.sort_by_key(|m| m.version);
            Ok(all)
        })
    }
}

/// PostgreSQL migrator with core and engine migrations.
pub async fn postgres_migrator() -> Result<Migrator, MigrateError> {
    Migrator::new(CombinedMigrations {
        core: &hosting_core::migrations::POSTGRES,
        engine: &ENGINE_POSTGRES,
    })
    .await
}

/// SQLite migrator with core and engine migrations.
pub async fn sqlite_migrator() -> Result<Migrator, MigrateError> {
    Migrator::new(CombinedMigrations {
        core: &hosting_core::migrations::SQLITE,
        engine: &ENGINE_SQLITE,
    })
    .await
}

/// Run all PostgreSQL migrations. Already-applied migrations are skipped.
pub async fn run_postgres(pool: &sqlx::PgPool) -> Result<(), MigrateError> {
    postgres_migrator().await?.run(pool).await
}

/// Run all SQLite migrations. Already-applied migrations are skipped.
pub async fn run_sqlite(pool: &sqlx::SqlitePool) -> Result<(), MigrateError> {
    sqlite_migrator().await?.run(pool).await
}

/// All PostgreSQL migrations (core + engine), sorted by version.
pub fn iter() -> impl Iterator<Item = Cow<'static, Migration>> {
    let core = hosting_core::migrations::POSTGRES.iter().map(Cow::Borrowed);
    let engine = ENGINE_POSTGRES.iter().map(Cow::Borrowed);

    let mut all: Vec<_> = core.chain(engine).collect();
    all.sort_by_key(|m| m.version);
    all.into_iter()
}
