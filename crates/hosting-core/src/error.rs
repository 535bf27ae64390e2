// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for hosting-core.
//!
//! Every variant carries enough context to identify the failed operation and
//! the resource it targeted. [`CoreError::kind`] folds the variants onto the
//! five error classes callers map to responses.

use thiserror::Error;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse error class used by API layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or a rejected transition guard.
    Validation,
    /// Missing row, node or shard.
    NotFound,
    /// Store failure.
    Persistence,
    /// The workflow engine was unreachable or rejected the call.
    Dispatch,
    /// A desired-state sub-query failed mid-aggregation.
    PartialFailure,
}

/// Core errors returned by lifecycle services, the dispatcher and the compiler.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Input validation failed.
    #[error("Validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// A transition guard rejected the operation.
    #[error("{resource_type} '{resource_id}' cannot {operation}: status is '{actual}', expected {expected}")]
    InvalidState {
        /// Resource type, e.g. `cron_job`.
        resource_type: String,
        /// Resource ID.
        resource_id: String,
        /// Operation that was attempted.
        operation: String,
        /// Human-readable list of accepted statuses.
        expected: String,
        /// Status observed in the store.
        actual: String,
    },

    /// A row, node or shard does not exist.
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        /// Resource type.
        resource_type: String,
        /// Resource ID.
        resource_id: String,
    },

    /// Store operation failed.
    #[error("Persistence error during '{operation}': {details}")]
    Persistence {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Handing a task to the workflow engine failed.
    #[error("Failed to dispatch workflow '{workflow_id}': {reason}")]
    Dispatch {
        /// Workflow ID of the task that was not delivered.
        workflow_id: String,
        /// The reason for failure.
        reason: String,
    },

    /// Desired state could not be compiled as a whole.
    #[error("Desired state for node '{node_id}' failed at {stage}: {details}")]
    PartialFailure {
        /// Node the document was requested for.
        node_id: String,
        /// Loader stage that failed.
        stage: String,
        /// Underlying error.
        details: String,
    },
}

impl CoreError {
    /// Build a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a not-found error.
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Returns a mapper wrapping a sqlx error with the attempted operation.
    pub fn persistence(operation: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
        move |err| CoreError::Persistence {
            operation: operation.to_string(),
            details: err.to_string(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::Dispatch { .. } => "DISPATCH_ERROR",
            Self::PartialFailure { .. } => "PARTIAL_FAILURE",
        }
    }

    /// Error class of this error. Guard rejections are validation errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidState { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Dispatch { .. } => ErrorKind::Dispatch,
            Self::PartialFailure { .. } => ErrorKind::PartialFailure,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Persistence {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Persistence {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases = vec![
            (CoreError::validation("name", "empty"), "VALIDATION_ERROR"),
            (
                CoreError::InvalidState {
                    resource_type: "webroot".into(),
                    resource_id: "w1".into(),
                    operation: "retry".into(),
                    expected: "failed".into(),
                    actual: "active".into(),
                },
                "INVALID_STATE",
            ),
            (CoreError::not_found("node", "n1"), "NOT_FOUND"),
            (
                CoreError::Dispatch {
                    workflow_id: "webroot-main-1".into(),
                    reason: "unreachable".into(),
                },
                "DISPATCH_ERROR",
            ),
            (
                CoreError::PartialFailure {
                    node_id: "n1".into(),
                    stage: "webroots".into(),
                    details: "boom".into(),
                },
                "PARTIAL_FAILURE",
            ),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_invalid_state_is_validation_kind() {
        let err = CoreError::InvalidState {
            resource_type: "cron_job".into(),
            resource_id: "c1".into(),
            operation: "retry".into(),
            expected: "'failed'".into(),
            actual: "active".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "cron_job 'c1' cannot retry: status is 'active', expected 'failed'"
        );
    }

    #[test]
    fn test_sqlx_error_maps_to_persistence() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        let err = CoreError::persistence("insert tenant")(sqlx::Error::PoolClosed);
        match err {
            CoreError::Persistence { operation, .. } => assert_eq!(operation, "insert tenant"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
