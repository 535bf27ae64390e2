// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hosting Server
//!
//! Serves the internal node API and runs the provisioning outbox workers
//! against one PostgreSQL database.

use std::sync::Arc;

use hosting_core::Config;
use hosting_core::services::Services;
use hosting_core::store::PostgresStore;
use hosting_engine::{
    EngineConfig, EngineRuntime, LogHandler, OutboxEngine, PgOutboxStore, RetentionConfig,
    WorkflowRegistry,
};
use hosting_server::{ServerConfig, router};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hosting_server=info,hosting_core=info,hosting_engine=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let server_config = ServerConfig::from_env()?;
    let core_config = Config::from_env()?;
    let engine_config = EngineConfig::from_env()?;
    let retention_config = RetentionConfig::from_env()?;

    info!(
        http_addr = %server_config.http_addr(),
        task_queue = %core_config.task_queue,
        workers = engine_config.workers,
        "Starting Hosting Server"
    );

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(server_config.db_max_connections)
        .connect(&server_config.database_url)
        .await?;
    info!("Connected to database");

    hosting_engine::migrations::run_postgres(&pool).await?;
    info!("Database migrations applied");

    let outbox = Arc::new(PgOutboxStore::new(pool.clone()));
    let engine = Arc::new(OutboxEngine::new(outbox.clone()));
    let services = Services::new(Arc::new(PostgresStore::new(pool)), engine, core_config);

    // Convergence happens on the nodes; the entity workflow orders and records tasks.
    let mut registry = WorkflowRegistry::new();
    registry.set_fallback(Arc::new(LogHandler));

    let runtime = EngineRuntime::builder()
        .config(engine_config)
        .retention(retention_config)
        .store(outbox)
        .registry(registry)
        .build()?
        .start();

    let listener = tokio::net::TcpListener::bind(server_config.http_addr()).await?;
    info!(addr = %server_config.http_addr(), "HTTP server ready");

    axum::serve(listener, router(services))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    runtime.shutdown().await?;

    info!("Hosting Server shut down");
    Ok(())
}
