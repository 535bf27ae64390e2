// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! One handle over every service, sharing a store and a dispatcher.

use std::sync::Arc;

use crate::config::Config;
use crate::cron_monitor::FailureThresholdMonitor;
use crate::desired_state::DesiredStateCompiler;
use crate::dispatch::ProvisionDispatcher;
use crate::engine::WorkflowEngine;
use crate::lifecycle::{
    CronJobService, DaemonService, DatabaseService, FqdnService, InfraService, Lifecycle,
    S3BucketService, SshKeyService, TenantService, ValkeyService, WebrootService,
};
use crate::placement::Placement;
use crate::store::ResourceStore;

#[derive(Clone)]
pub struct Services {
    pub lifecycle: Lifecycle,
    pub infra: InfraService,
    pub tenants: TenantService,
    pub webroots: WebrootService,
    pub fqdns: FqdnService,
    pub cron_jobs: CronJobService,
    pub daemons: DaemonService,
    pub ssh_keys: SshKeyService,
    pub databases: DatabaseService,
    pub valkey: ValkeyService,
    pub s3_buckets: S3BucketService,
    pub placement: Placement,
    pub desired_state: DesiredStateCompiler,
    pub cron_monitor: FailureThresholdMonitor,
}

impl Services {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        engine: Arc<dyn WorkflowEngine>,
        config: Config,
    ) -> Self {
        let dispatcher = ProvisionDispatcher::new(engine, config);
        let lifecycle = Lifecycle::new(store.clone(), dispatcher);

        Self {
            infra: InfraService::new(lifecycle.clone()),
            tenants: TenantService::new(lifecycle.clone()),
            webroots: WebrootService::new(lifecycle.clone()),
            fqdns: FqdnService::new(lifecycle.clone()),
            cron_jobs: CronJobService::new(lifecycle.clone()),
            daemons: DaemonService::new(lifecycle.clone()),
            ssh_keys: SshKeyService::new(lifecycle.clone()),
            databases: DatabaseService::new(lifecycle.clone()),
            valkey: ValkeyService::new(lifecycle.clone()),
            s3_buckets: S3BucketService::new(lifecycle.clone()),
            placement: Placement::new(store.clone()),
            desired_state: DesiredStateCompiler::new(store),
            cron_monitor: FailureThresholdMonitor::new(lifecycle.clone()),
            lifecycle,
        }
    }
}
