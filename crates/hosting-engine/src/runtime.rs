// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for hosting-engine.
//!
//! [`EngineRuntime`] runs a pool of [`EntityWorker`]s inside an existing
//! tokio application. Pair it with an [`OutboxEngine`](crate::OutboxEngine)
//! on the same store so dispatched tasks are picked up.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hosting_engine::{EngineRuntime, LogHandler, PgOutboxStore, WorkflowRegistry};
//!
//! let store = Arc::new(PgOutboxStore::new(pool.clone()));
//! let mut registry = WorkflowRegistry::new();
//! registry.set_fallback(Arc::new(LogHandler));
//!
//! let runtime = EngineRuntime::builder()
//!     .store(store)
//!     .registry(registry)
//!     .workers(4)
//!     .build()?
//!     .start();
//!
//! // ... run your application ...
//!
//! runtime.shutdown().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::{EngineConfig, RetentionConfig};
use crate::registry::WorkflowRegistry;
use crate::retention::RetentionWorker;
use crate::store::OutboxStore;
use crate::worker::{EntityWorker, EntityWorkerConfig};

/// Builder for creating an [`EngineRuntime`].
pub struct EngineRuntimeBuilder {
    store: Option<Arc<dyn OutboxStore>>,
    registry: WorkflowRegistry,
    worker_id: String,
    workers: usize,
    poll_interval: Duration,
    lease: Duration,
    batch_size: usize,
    retention: RetentionConfig,
}

impl Default for EngineRuntimeBuilder {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            store: None,
            registry: WorkflowRegistry::new(),
            worker_id: config.worker_id,
            workers: config.workers,
            poll_interval: config.poll_interval,
            lease: config.lease,
            batch_size: EntityWorkerConfig::default().batch_size,
            retention: RetentionConfig::default(),
        }
    }
}

impl EngineRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply worker ID, worker count, poll interval and lease from `config`.
    /// Retention is configured separately through [`retention`](Self::retention).
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.worker_id = config.worker_id;
        self.workers = config.workers;
        self.poll_interval = config.poll_interval;
        self.lease = config.lease;
        self
    }

    /// Set the outbox store (required).
    pub fn store(mut self, store: Arc<dyn OutboxStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the workflow handlers.
    pub fn registry(mut self, registry: WorkflowRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the worker ID prefix. Workers are named `{prefix}-{index}`.
    pub fn worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// Set the number of workers.
    ///
    /// Default: 4
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the idle poll interval.
    ///
    /// Default: 500 milliseconds
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the execution lease.
    ///
    /// Default: 60 seconds
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Set the number of signals a worker runs per claim.
    ///
    /// Default: 32
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set outbox retention. Pass a config with `enabled: false` to keep
    /// every processed row.
    ///
    /// Default: [`RetentionConfig::default`]
    pub fn retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = retention;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if the store is missing or a setting is zero.
    pub fn build(self) -> Result<EngineRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;
        if self.workers == 0 {
            anyhow::bail!("workers must be greater than zero");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than zero");
        }
        if self.lease.is_zero() {
            anyhow::bail!("lease must be greater than zero");
        }
        if self.retention.enabled && self.retention.batch_size <= 0 {
            anyhow::bail!("retention batch_size must be greater than zero");
        }

        Ok(EngineRuntimeConfig {
            store,
            registry: Arc::new(self.registry),
            worker_id: self.worker_id,
            workers: self.workers,
            worker_config: EntityWorkerConfig {
                poll_interval: self.poll_interval,
                lease: self.lease,
                batch_size: self.batch_size,
            },
            retention: self.retention,
        })
    }
}

/// Configuration for an [`EngineRuntime`].
pub struct EngineRuntimeConfig {
    store: Arc<dyn OutboxStore>,
    registry: Arc<WorkflowRegistry>,
    worker_id: String,
    workers: usize,
    worker_config: EntityWorkerConfig,
    retention: RetentionConfig,
}

impl EngineRuntimeConfig {
    /// Spawn the workers.
    pub fn start(self) -> EngineRuntime {
        let mut handles = Vec::with_capacity(self.workers);
        let mut shutdowns = Vec::with_capacity(self.workers);

        for index in 0..self.workers {
            let worker = EntityWorker::new(
                format!("{}-{}", self.worker_id, index),
                self.store.clone(),
                self.registry.clone(),
                self.worker_config.clone(),
            );
            shutdowns.push(worker.shutdown_handle());
            handles.push(tokio::spawn(async move { worker.run().await }));
        }

        let retention = self.retention.enabled.then(|| {
            let worker = RetentionWorker::new(self.store.clone(), self.retention.clone());
            let shutdown = worker.shutdown_handle();
            (tokio::spawn(async move { worker.run().await }), shutdown)
        });

        info!(
            worker_id = %self.worker_id,
            workers = self.workers,
            retention = self.retention.enabled,
            workflows = ?self.registry.names(),
            "EngineRuntime started"
        );

        EngineRuntime {
            handles,
            shutdowns,
            retention,
        }
    }
}

/// Running engine workers.
pub struct EngineRuntime {
    handles: Vec<JoinHandle<()>>,
    shutdowns: Vec<Arc<Notify>>,
    retention: Option<(JoinHandle<()>, Arc<Notify>)>,
}

impl EngineRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> EngineRuntimeBuilder {
        EngineRuntimeBuilder::new()
    }

    /// Number of entity workers.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    pub fn retention_enabled(&self) -> bool {
        self.retention.is_some()
    }

    /// Signal every worker to stop and wait for them. A worker finishes the
    /// poll it is in before it stops.
    pub async fn shutdown(self) -> Result<()> {
        info!("EngineRuntime shutting down...");

        for shutdown in &self.shutdowns {
            shutdown.notify_one();
        }

        let mut panicked = 0;
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Entity worker task panicked: {}", e);
                panicked += 1;
            }
        }

        if let Some((handle, shutdown)) = self.retention {
            shutdown.notify_one();
            if let Err(e) = handle.await {
                error!("Outbox retention task panicked: {}", e);
                panicked += 1;
            }
        }

        if panicked > 0 {
            anyhow::bail!("{} engine task(s) panicked", panicked);
        }
        info!("EngineRuntime shutdown complete");
        Ok(())
    }
}
