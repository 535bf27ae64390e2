// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for hosting-engine.

use hosting_core::engine::EngineError;
use thiserror::Error;

/// Result type using OutboxError
pub type Result<T> = std::result::Result<T, OutboxError>;

/// Outbox store and worker errors.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// A database statement failed.
    #[error("Outbox database error during '{operation}': {source}")]
    Database {
        /// The operation that failed.
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A stored signal argument is not valid JSON.
    #[error("Signal {seq} has a malformed argument: {source}")]
    MalformedArgument {
        seq: i64,
        #[source]
        source: serde_json::Error,
    },

    /// Migrations could not be applied.
    #[error("Outbox migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl OutboxError {
    /// Returns a mapper wrapping a sqlx error with the attempted operation.
    pub fn database(operation: &'static str) -> impl FnOnce(sqlx::Error) -> OutboxError {
        move |source| OutboxError::Database { operation, source }
    }
}

impl From<OutboxError> for EngineError {
    fn from(err: OutboxError) -> Self {
        EngineError::Unavailable(err.to_string())
    }
}
