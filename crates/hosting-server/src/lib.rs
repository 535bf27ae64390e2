// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hosting Server - internal node API.
//!
//! Node agents pull their desired state and report cron job outcomes here.
//! The binary also runs the outbox workers that drive provisioning.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `GET` | `/internal/v1/nodes/{node_id}/desired-state` | `200` desired-state document |
//! | `POST` | `/internal/v1/cron-jobs/{cron_job_id}/outcome` | `204`, body `{"success": bool}` |
//! | `GET` | `/health` | `200` |
//!
//! Errors are `{"error": {"code": ..., "message": ...}}` with status 400
//! (validation), 409 (invalid state), 404 (not found), 502 (dispatch) or
//! 500 (persistence, partial failure).

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{CronOutcomeRequest, router};
