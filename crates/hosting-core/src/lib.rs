// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hosting control plane core.
//!
//! This crate owns the resource lifecycle of a multi-tenant hosting
//! platform. It records intent in a relational store, hands provisioning
//! work to a durable workflow engine, and compiles the declarative state
//! each node agent converges towards.
//!
//! # Architecture
//!
//! ```text
//!   API layer ──► lifecycle services ──► ResourceStore (Postgres / SQLite)
//!                        │
//!                        ▼
//!               ProvisionDispatcher ──signal-with-start──► WorkflowEngine
//!                                                       (one execution per tenant)
//!
//!   node agent ──pull──► DesiredStateCompiler ──► ResourceStore
//!   cron runner ─report─► FailureThresholdMonitor ──► ResourceStore, dispatcher
//! ```
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HOSTING_TASK_QUEUE` | `hosting-tasks` | Task queue of entity executions |
//! | `HOSTING_ENTITY_WORKFLOW` | `TenantProvisionWorkflow` | Entity workflow type |
//! | `HOSTING_PROVISION_SIGNAL` | `provision` | Signal name carrying a task |
//!
//! # Modules
//!
//! - [`lifecycle`]: per-resource services over one shared state machine
//! - [`dispatch`]: per-tenant signal-with-start dispatch
//! - [`desired_state`]: per-node desired-state compilation
//! - [`placement`]: node selection and port allocation
//! - [`cron_monitor`]: cron failure counting and auto-disable
//! - [`store`]: Postgres and SQLite persistence

/// Configuration loaded from environment variables.
pub mod config;

/// Cron job failure counting and automatic disable.
pub mod cron_monitor;

/// Per-node desired-state compilation.
pub mod desired_state;

/// Per-tenant provisioning dispatch.
pub mod dispatch;

/// Workflow engine interface and the recording mock.
pub mod engine;

/// Error types and the error taxonomy.
pub mod error;

/// Resource lifecycle services.
pub mod lifecycle;

/// Embedded database migrations.
pub mod migrations;

/// Domain model.
pub mod model;

/// Node selection and port allocation.
pub mod placement;

/// Service bundle.
pub mod services;

/// Resource persistence.
pub mod store;

/// Input validation.
pub mod validate;

/// Deterministic workflow IDs.
pub mod workflow_id;

pub use config::Config;
pub use error::{CoreError, ErrorKind, Result};
pub use services::Services;
