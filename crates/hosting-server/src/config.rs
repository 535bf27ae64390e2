// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server configuration.

use std::net::SocketAddr;

use hosting_core::config::ConfigError;

/// Server settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// HTTP listen port.
    pub http_port: u16,
    /// Database pool size.
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HOSTING_DATABASE_URL` (required)
    /// - `HOSTING_HTTP_PORT` (default: 8090)
    /// - `HOSTING_DB_MAX_CONNECTIONS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("HOSTING_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("HOSTING_DATABASE_URL"))?;

        let http_port = match std::env::var("HOSTING_HTTP_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|_| ConfigError::Invalid("HOSTING_HTTP_PORT", "must be a port number"))?,
            Err(_) => 8090,
        };

        let db_max_connections = match std::env::var("HOSTING_DB_MAX_CONNECTIONS") {
            Ok(n) => match n.parse() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid(
                        "HOSTING_DB_MAX_CONNECTIONS",
                        "must be a positive integer",
                    ));
                }
                Ok(n) => n,
            },
            Err(_) => 10,
        };

        Ok(Self {
            database_url,
            http_port,
            db_max_connections,
        })
    }

    /// Address the HTTP server binds to.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }
}
