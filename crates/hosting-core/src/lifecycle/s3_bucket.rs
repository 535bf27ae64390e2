// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

use super::{Lifecycle, Resource, new_id, now, shard_with_role};
use crate::error::{CoreError, Result};
use crate::model::{ResourceKind, ResourceStatus, S3BucketRecord, ShardRole};
use crate::validate;

impl Resource for S3BucketRecord {
    const KIND: ResourceKind = ResourceKind::S3Bucket;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateS3Bucket {
    pub tenant_id: Option<String>,
    pub shard_id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
    /// Zero means unlimited.
    #[serde(default)]
    pub quota_bytes: i64,
}

#[derive(Clone)]
pub struct S3BucketService {
    lifecycle: Lifecycle,
}

impl S3BucketService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn create(&self, req: CreateS3Bucket) -> Result<S3BucketRecord> {
        validate::name("name", &req.name)?;
        if req.quota_bytes < 0 {
            return Err(CoreError::validation("quota_bytes", "must not be negative"));
        }

        let store = self.lifecycle.store();
        shard_with_role(store.as_ref(), &req.shard_id, ShardRole::Storage).await?;
        if let Some(tenant_id) = &req.tenant_id
            && store.get_tenant(tenant_id).await?.is_none()
        {
            return Err(CoreError::not_found("tenant", tenant_id));
        }

        let created_at = now();
        let bucket = S3BucketRecord {
            id: new_id(),
            tenant_id: req.tenant_id,
            shard_id: req.shard_id,
            name: req.name,
            public: req.public,
            quota_bytes: req.quota_bytes,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_s3_bucket(&bucket).await?;

        self.lifecycle.created(&bucket).await?;
        Ok(bucket)
    }

    pub async fn get(&self, id: &str) -> Result<S3BucketRecord> {
        self.lifecycle
            .store()
            .get_s3_bucket(id)
            .await?
            .ok_or_else(|| CoreError::not_found("s3_bucket", id))
    }

    pub async fn list(&self, shard_id: &str) -> Result<Vec<S3BucketRecord>> {
        self.lifecycle.store().list_s3_buckets(shard_id, &[]).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let bucket = self.get(id).await?;
        self.lifecycle.delete(&bucket).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let bucket = self.get(id).await?;
        self.lifecycle.retry(&bucket).await
    }
}
