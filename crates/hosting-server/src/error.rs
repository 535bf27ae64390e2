// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mapping of core errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hosting_core::CoreError;
use serde_json::json;
use tracing::error;

/// A [`CoreError`] rendered as `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.error_code() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "INVALID_STATE" => StatusCode::CONFLICT,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "DISPATCH_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

/// A body that is not the expected JSON is a validation error on `body`.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CoreError::validation("body", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.error_code(), error = %self.0, "Request failed");
        }
        let body = json!({
            "error": {
                "code": self.0.error_code(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_error_class() {
        let cases = [
            (CoreError::validation("name", "bad"), StatusCode::BAD_REQUEST),
            (CoreError::not_found("node", "n1"), StatusCode::NOT_FOUND),
            (
                CoreError::Dispatch {
                    workflow_id: "w".into(),
                    reason: "down".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                CoreError::Persistence {
                    operation: "q".into(),
                    details: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::PartialFailure {
                    node_id: "n1".into(),
                    stage: "fqdns".into(),
                    details: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
