// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL outbox tests. Skipped unless TEST_HOSTING_ENGINE_DATABASE_URL is set.
//!
//! Use a database separate from the hosting-core tests: the combined engine
//! history is a superset the core-only migrator does not recognize.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingHandler, start, task};
use hosting_engine::{EntityWorker, EntityWorkerConfig, OutboxStore, PgOutboxStore, WorkflowRegistry};
use sqlx::PgPool;
use uuid::Uuid;

/// Helper macro to skip tests if database URL is not set.
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_HOSTING_ENGINE_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_HOSTING_ENGINE_DATABASE_URL not set");
            return;
        }
    };
}

async fn store() -> Arc<PgOutboxStore> {
    let url = std::env::var("TEST_HOSTING_ENGINE_DATABASE_URL").expect("TEST_HOSTING_ENGINE_DATABASE_URL");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to database");
    hosting_engine::migrations::run_postgres(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(PgOutboxStore::new(pool))
}

#[tokio::test]
async fn test_postgres_signal_claim_and_close() {
    skip_if_no_db!();
    let store = store().await;
    let tenant = Uuid::new_v4().simple().to_string();
    let options = start(&tenant);
    let first_id = format!("a-{}", tenant);
    let second_id = format!("b-{}", tenant);

    let first = store
        .signal_with_start(&options, "provision", &task(&first_id))
        .await
        .unwrap();
    let duplicate = store
        .signal_with_start(&options, "provision", &task(&first_id))
        .await
        .unwrap();
    store
        .signal_with_start(&options, "provision", &task(&second_id))
        .await
        .unwrap();
    assert!(first.started);
    assert!(duplicate.deduplicated);

    let handler = RecordingHandler::default();
    let mut registry = WorkflowRegistry::new();
    registry.set_fallback(Arc::new(handler.clone()));
    let worker = EntityWorker::new(
        format!("pg-{}", tenant),
        store.clone() as Arc<dyn OutboxStore>,
        Arc::new(registry),
        EntityWorkerConfig {
            lease: Duration::from_secs(30),
            ..Default::default()
        },
    );

    // Other tests may share the database; drain until our execution closes.
    for _ in 0..50 {
        worker.tick().await.unwrap();
        let execution = store
            .get_execution(&options.execution_id)
            .await
            .unwrap()
            .unwrap();
        if execution.status == "closed" {
            break;
        }
    }

    let ours: Vec<String> = handler
        .runs()
        .await
        .into_iter()
        .filter(|(execution, _)| *execution == options.execution_id)
        .map(|(_, id)| id)
        .collect();
    assert_eq!(ours, vec![first_id, second_id]);
}
