// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hosting Engine - durable outbox for per-tenant provisioning.
//!
//! Implements the entity workflow the control plane dispatches into: one
//! long-lived execution per tenant, fed by signals and processed one task at
//! a time in delivery order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  signal_with_start   ┌──────────────────────┐
//! │  ProvisionDispatcher │ ───────────────────► │     OutboxEngine     │
//! │    (hosting-core)    │                      └──────────┬───────────┘
//! └──────────────────────┘                                 │ one transaction
//!                                                          ▼
//!                          ┌────────────────────────────────────────────┐
//!                          │ entity_executions        provision_signals │
//!                          │ (lease per tenant)       (ordered by seq)  │
//!                          └──────────────────────┬─────────────────────┘
//!                                                 │ claim / renew / close
//!                                                 ▼
//!                          ┌────────────────────────────────────────────┐
//!                          │ EngineRuntime: N × EntityWorker            │
//!                          │   └─► WorkflowRegistry ─► WorkflowHandler  │
//!                          └────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - A tenant's signals run strictly in `seq` order and never concurrently:
//!   only the worker holding the execution's lease touches them.
//! - A pending `(workflow_name, workflow_id)` is queued once; re-delivery is
//!   reported as `deduplicated`.
//! - A crashed worker's executions become claimable when the lease expires.
//!   The lease is renewed while a workflow runs, so a slow workflow keeps it.
//! - Processed signals and closed executions are pruned after a retention
//!   period; pending work never is.
//!
//! # Configuration
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOSTING_ENGINE_WORKER_ID` | Worker ID prefix recorded on claims | random |
//! | `HOSTING_ENGINE_POLL_INTERVAL_MS` | Idle poll interval | `500` |
//! | `HOSTING_ENGINE_LEASE_SECS` | Execution lease | `60` |
//! | `HOSTING_ENGINE_WORKERS` | Concurrent workers | `4` |
//! | `HOSTING_ENGINE_RETENTION_ENABLED` | Prune processed outbox rows | `true` |
//! | `HOSTING_ENGINE_RETENTION_POLL_INTERVAL_SECS` | Retention pass interval | `3600` |
//! | `HOSTING_ENGINE_RETENTION_MAX_AGE_HOURS` | Age of prunable rows | `168` |
//! | `HOSTING_ENGINE_RETENTION_BATCH_SIZE` | Rows deleted per statement | `500` |

/// Worker configuration from environment variables.
pub mod config;
/// [`WorkflowEngine`](hosting_core::engine::WorkflowEngine) over the outbox.
pub mod engine;
/// Error types.
pub mod error;
/// Combined core and engine migrations.
pub mod migrations;
/// Workflow handler registry.
pub mod registry;
/// Outbox retention worker.
pub mod retention;
/// Embeddable worker runtime.
pub mod runtime;
/// Outbox persistence (PostgreSQL and SQLite).
pub mod store;
/// Entity execution worker.
pub mod worker;

pub use config::{EngineConfig, RetentionConfig};
pub use engine::OutboxEngine;
pub use error::{OutboxError, Result};
pub use registry::{LogHandler, WorkflowHandler, WorkflowRegistry};
pub use retention::{PruneReport, RetentionWorker};
pub use runtime::{EngineRuntime, EngineRuntimeBuilder};
pub use store::{OutboxStore, PgOutboxStore, SqliteOutboxStore};
pub use worker::{EntityWorker, EntityWorkerConfig, TickReport};
