// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource lifecycle services.
//!
//! Every resource type follows one state machine:
//!
//! ```text
//! pending --Create dispatch--> provisioning
//! provisioning --(workflow success)--> active
//! provisioning --(workflow failure)--> failed
//! failed --Retry--> provisioning
//! active --Delete--> deleting --(workflow success)--> row removed
//! active --Suspend--> suspended --Unsuspend--> pending
//! active/auto_disabled --Enable--> provisioning --> active
//! active --Disable--> provisioning --> active (disabled)
//! active,enabled --N consecutive failures (cron only)--> auto_disabled
//! ```
//!
//! [`Lifecycle`] implements the transitions once; the per-type services
//! below add validation, placement and the type's own fields. Guards are
//! read-then-compare-and-swap. A write is never rolled back when the
//! following dispatch fails; the resource stays visibly in its new status
//! until `retry` is called.

mod cron_job;
mod daemon;
mod database;
mod fqdn;
mod infra;
mod s3_bucket;
mod ssh_key;
mod tenant;
mod valkey;
mod webroot;

pub use self::cron_job::{CreateCronJob, CronJobService, UpdateCronJob};
pub use self::daemon::{CreateDaemon, DaemonService, UpdateDaemon};
pub use self::database::{CreateDatabase, CreateDatabaseUser, DatabaseService};
pub use self::fqdn::{CreateFqdn, FqdnService};
pub use self::infra::{CreateNode, CreateShard, InfraService};
pub use self::s3_bucket::{CreateS3Bucket, S3BucketService};
pub use self::ssh_key::{CreateSshKey, SshKeyService};
pub use self::tenant::{CreateTenant, TenantService};
pub use self::valkey::{CreateValkeyInstance, CreateValkeyUser, ValkeyService};
pub use self::webroot::{CreateWebroot, UpdateWebroot, WebrootService};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::dispatch::ProvisionDispatcher;
use crate::error::{CoreError, Result};
use crate::model::{ProvisionTask, ResourceKind, ResourceStatus, ShardRecord, ShardRole};
use crate::store::ResourceStore;
use crate::workflow_id::workflow_id;

use ResourceStatus::*;

/// Statuses from which a resource may be deleted.
const DELETABLE: &[ResourceStatus] = &[Active, Failed, Suspended, AutoDisabled];

/// A lifecycle-managed row.
pub trait Resource: Serialize + Send + Sync {
    const KIND: ResourceKind;

    fn id(&self) -> &str;
    /// Human-readable name used in workflow IDs.
    fn name(&self) -> &str;
    /// Tenant whose entity execution serializes this resource's work.
    fn tenant_id(&self) -> Option<&str>;
    fn status(&self) -> ResourceStatus;
}

/// Operation a workflow performs on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Update,
    Delete,
    Enable,
    Disable,
    Suspend,
    Unsuspend,
}

impl Verb {
    fn title(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Enable => "Enable",
            Self::Disable => "Disable",
            Self::Suspend => "Suspend",
            Self::Unsuspend => "Unsuspend",
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Suspend => "suspend",
            Self::Unsuspend => "unsuspend",
        }
    }

    /// Workflow type name, e.g. `DisableCronJobWorkflow`.
    pub fn workflow_name(&self, kind: ResourceKind) -> String {
        format!("{}{}Workflow", self.title(), kind.workflow_noun())
    }

    /// Workflow ID for this verb on `(name, id)`. Create uses the bare kind
    /// prefix so a retried create reuses the original ID.
    pub fn workflow_id(&self, kind: ResourceKind, name: &str, id: &str) -> String {
        match self {
            Self::Create => workflow_id(kind.workflow_prefix(), name, id),
            other => workflow_id(
                &format!("{}-{}", other.tag(), kind.workflow_prefix()),
                name,
                id,
            ),
        }
    }
}

/// Result of a workflow, reported back by the workflow implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The workflow picked the resource up.
    Provisioning,
    /// The workflow converged the resource.
    Active,
    /// The workflow gave up; the message is shown to the user.
    Failed(String),
    /// A delete workflow finished; the row is removed.
    Deleted,
}

/// Shared state machine over a store and a dispatcher.
#[derive(Clone)]
pub struct Lifecycle {
    store: Arc<dyn ResourceStore>,
    dispatcher: ProvisionDispatcher,
}

impl Lifecycle {
    pub fn new(store: Arc<dyn ResourceStore>, dispatcher: ProvisionDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &ProvisionDispatcher {
        &self.dispatcher
    }

    /// Build the task for `verb` on `record`, with the record as argument.
    pub fn task<R: Resource>(verb: Verb, record: &R) -> Result<ProvisionTask> {
        Ok(ProvisionTask {
            workflow_name: verb.workflow_name(R::KIND),
            workflow_id: verb.workflow_id(R::KIND, record.name(), record.id()),
            arg: serde_json::to_value(record)?,
            resource_type: R::KIND.as_str().to_string(),
            resource_id: record.id().to_string(),
        })
    }

    /// Dispatch `verb` for `record` through its tenant's execution.
    pub async fn dispatch<R: Resource>(&self, verb: Verb, record: &R) -> Result<()> {
        let task = Self::task(verb, record)?;
        self.dispatcher.dispatch_for(record.tenant_id(), task).await
    }

    /// Dispatch the create workflow for a freshly inserted `pending` row.
    pub async fn created<R: Resource>(&self, record: &R) -> Result<()> {
        info!(
            resource_type = %R::KIND,
            resource_id = %record.id(),
            name = %record.name(),
            "Resource created"
        );
        self.dispatch(Verb::Create, record).await
    }

    /// `failed -> provisioning`, then re-dispatch the create workflow.
    pub async fn retry<R: Resource>(&self, record: &R) -> Result<()> {
        self.guarded(record, "retry", &[Failed], Provisioning, None)
            .await?;
        self.dispatch(Verb::Create, record).await
    }

    /// `active -> deleting`, then dispatch the delete workflow.
    pub async fn delete<R: Resource>(&self, record: &R) -> Result<()> {
        self.guarded(record, "delete", DELETABLE, Deleting, None)
            .await?;
        self.dispatch(Verb::Delete, record).await
    }

    /// `active -> suspended`.
    pub async fn suspend<R: Resource>(&self, record: &R) -> Result<()> {
        self.guarded(record, "suspend", &[Active], Suspended, None)
            .await?;
        self.dispatch(Verb::Suspend, record).await
    }

    /// `suspended -> pending`.
    pub async fn unsuspend<R: Resource>(&self, record: &R) -> Result<()> {
        self.guarded(record, "unsuspend", &[Suspended], Pending, None)
            .await?;
        self.dispatch(Verb::Unsuspend, record).await
    }

    /// `from -> provisioning` with `enabled = true`.
    pub async fn enable<R: Resource>(&self, record: &R, from: &[ResourceStatus]) -> Result<()> {
        self.guarded(record, "enable", from, Provisioning, Some(true))
            .await?;
        self.dispatch(Verb::Enable, record).await
    }

    /// `active -> provisioning` with `enabled = false`.
    pub async fn disable<R: Resource>(&self, record: &R) -> Result<()> {
        self.guarded(record, "disable", &[Active], Provisioning, Some(false))
            .await?;
        self.dispatch(Verb::Disable, record).await
    }

    /// Reject field updates on a resource that is being deleted.
    pub fn check_updatable<R: Resource>(record: &R) -> Result<()> {
        if record.status() == Deleting {
            return Err(rejected(
                R::KIND,
                record.id(),
                "update",
                &[Pending, Provisioning, Active, Suspended, Failed, AutoDisabled],
                Deleting,
            ));
        }
        Ok(())
    }

    /// Dispatch the update workflow after the service wrote new fields.
    pub async fn updated<R: Resource>(&self, record: &R) -> Result<()> {
        self.dispatch(Verb::Update, record).await
    }

    /// Apply a workflow's result to a resource row.
    ///
    /// Repeated reports of the same outcome are accepted. A `Deleted` report
    /// for a row that is already gone succeeds.
    pub async fn report_outcome(
        &self,
        kind: ResourceKind,
        id: &str,
        outcome: ProvisionOutcome,
    ) -> Result<()> {
        let (from, to, message): (&[ResourceStatus], ResourceStatus, Option<&str>) = match &outcome
        {
            ProvisionOutcome::Provisioning => (&[Pending, Provisioning], Provisioning, None),
            ProvisionOutcome::Active => (&[Pending, Provisioning, Active], Active, None),
            ProvisionOutcome::Failed(message) => (
                &[Pending, Provisioning, Deleting, Failed],
                Failed,
                Some(message.as_str()),
            ),
            ProvisionOutcome::Deleted => {
                return match self.store.current_status(kind, id).await? {
                    None => Ok(()),
                    Some(Deleting) => {
                        self.store.delete_row(kind, id).await?;
                        info!(resource_type = %kind, resource_id = %id, "Resource deleted");
                        Ok(())
                    }
                    Some(actual) => Err(rejected(kind, id, "finish deletion", &[Deleting], actual)),
                };
            }
        };

        if self.store.transition(kind, id, from, to, message).await? {
            info!(resource_type = %kind, resource_id = %id, status = %to, "Workflow outcome applied");
            return Ok(());
        }

        match self.store.current_status(kind, id).await? {
            None => Err(CoreError::not_found(kind.as_str(), id)),
            Some(actual) => Err(rejected(kind, id, "apply workflow outcome", from, actual)),
        }
    }

    async fn guarded<R: Resource>(
        &self,
        record: &R,
        operation: &str,
        from: &[ResourceStatus],
        to: ResourceStatus,
        enabled: Option<bool>,
    ) -> Result<()> {
        let kind = R::KIND;
        let id = record.id();

        if !from.contains(&record.status()) {
            warn!(
                resource_type = %kind,
                resource_id = %id,
                operation,
                status = %record.status(),
                "Transition rejected"
            );
            return Err(rejected(kind, id, operation, from, record.status()));
        }

        let applied = match enabled {
            Some(enabled) => self.store.set_enabled(kind, id, enabled, from, to).await?,
            None => self.store.transition(kind, id, from, to, None).await?,
        };

        if !applied {
            // Status changed between the read and the write.
            let actual = self
                .store
                .current_status(kind, id)
                .await?
                .ok_or_else(|| CoreError::not_found(kind.as_str(), id))?;
            return Err(rejected(kind, id, operation, from, actual));
        }

        info!(
            resource_type = %kind,
            resource_id = %id,
            operation,
            from = %record.status(),
            to = %to,
            "Resource status changed"
        );
        Ok(())
    }
}

fn rejected(
    kind: ResourceKind,
    id: &str,
    operation: &str,
    expected: &[ResourceStatus],
    actual: ResourceStatus,
) -> CoreError {
    CoreError::InvalidState {
        resource_type: kind.as_str().to_string(),
        resource_id: id.to_string(),
        operation: operation.to_string(),
        expected: ResourceStatus::describe(expected),
        actual: actual.as_str().to_string(),
    }
}

/// Load a shard and check it serves `role`.
pub(crate) async fn shard_with_role(
    store: &dyn ResourceStore,
    shard_id: &str,
    role: ShardRole,
) -> Result<ShardRecord> {
    let shard = store
        .get_shard(shard_id)
        .await?
        .ok_or_else(|| CoreError::not_found("shard", shard_id))?;
    if shard.role != role {
        return Err(CoreError::validation(
            "shard_id",
            format!(
                "shard '{}' has role '{}', expected '{}'",
                shard_id, shard.role, role
            ),
        ));
    }
    Ok(shard)
}

/// New random resource ID.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Random secret for credentials the caller did not supply.
pub(crate) fn generate_password() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
