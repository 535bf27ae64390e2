// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP routes of the internal node API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hosting_core::Services;
use hosting_core::model::DesiredState;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ApiError;

#[derive(Clone)]
struct AppState {
    services: Services,
}

/// Body of a cron outcome report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CronOutcomeRequest {
    pub success: bool,
}

/// Build the API router over `services`.
pub fn router(services: Services) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/internal/v1/nodes/{node_id}/desired-state",
            get(desired_state),
        )
        .route(
            "/internal/v1/cron-jobs/{cron_job_id}/outcome",
            post(cron_outcome),
        )
        .with_state(AppState { services })
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn desired_state(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<DesiredState>, ApiError> {
    let document = state.services.desired_state.get_for_node(&node_id).await?;
    debug!(node_id = %node_id, "Desired state served");
    Ok(Json(document))
}

async fn cron_outcome(
    State(state): State<AppState>,
    Path(cron_job_id): Path<String>,
    body: Result<Json<CronOutcomeRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body?;
    state
        .services
        .cron_monitor
        .report_cron_outcome(&cron_job_id, request.success)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
