// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{Lifecycle, Resource, new_id, now};
use crate::error::{CoreError, Result};
use crate::model::{ResourceKind, ResourceStatus, WebrootRecord};
use crate::validate;

impl Resource for WebrootRecord {
    const KIND: ResourceKind = ResourceKind::Webroot;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tenant_id(&self) -> Option<&str> {
        Some(&self.tenant_id)
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebroot {
    pub tenant_id: String,
    pub name: String,
    pub runtime: String,
    pub runtime_version: String,
    #[serde(default)]
    pub runtime_config: serde_json::Value,
    #[serde(default)]
    pub public_folder: String,
    #[serde(default = "default_env_file_name")]
    pub env_file_name: String,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

fn default_env_file_name() -> String {
    ".env".to_string()
}

/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWebroot {
    pub runtime: Option<String>,
    pub runtime_version: Option<String>,
    pub runtime_config: Option<serde_json::Value>,
    pub public_folder: Option<String>,
    pub env_file_name: Option<String>,
    /// Replaces the whole environment when present.
    pub env_vars: Option<BTreeMap<String, String>>,
}

#[derive(Clone)]
pub struct WebrootService {
    lifecycle: Lifecycle,
}

impl WebrootService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn create(&self, req: CreateWebroot) -> Result<WebrootRecord> {
        validate::name("name", &req.name)?;
        validate::required("runtime", &req.runtime)?;
        validate::required("runtime_version", &req.runtime_version)?;
        validate::relative_path("public_folder", &req.public_folder)?;
        validate::required("env_file_name", &req.env_file_name)?;
        for key in req.env_vars.keys() {
            validate::required("env_vars", key)?;
        }

        let store = self.lifecycle.store();
        if store.get_tenant(&req.tenant_id).await?.is_none() {
            return Err(CoreError::not_found("tenant", &req.tenant_id));
        }

        let created_at = now();
        let webroot = WebrootRecord {
            id: new_id(),
            tenant_id: req.tenant_id,
            name: req.name,
            runtime: req.runtime,
            runtime_version: req.runtime_version,
            runtime_config: config_text(&req.runtime_config)?,
            public_folder: req.public_folder,
            env_file_name: req.env_file_name,
            status: ResourceStatus::Pending,
            status_message: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_webroot(&webroot).await?;
        store.replace_env_vars(&webroot.id, &req.env_vars).await?;

        self.lifecycle.created(&webroot).await?;
        Ok(webroot)
    }

    pub async fn get(&self, id: &str) -> Result<WebrootRecord> {
        self.lifecycle
            .store()
            .get_webroot(id)
            .await?
            .ok_or_else(|| CoreError::not_found("webroot", id))
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<WebrootRecord>> {
        self.lifecycle.store().list_webroots(tenant_id, &[]).await
    }

    pub async fn env_vars(&self, id: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .lifecycle
            .store()
            .list_env_vars(id)
            .await?
            .into_iter()
            .map(|v| (v.name, v.value))
            .collect())
    }

    /// Write new settings and dispatch the update workflow.
    pub async fn update(&self, id: &str, req: UpdateWebroot) -> Result<WebrootRecord> {
        let mut webroot = self.get(id).await?;
        Lifecycle::check_updatable(&webroot)?;

        if let Some(runtime) = req.runtime {
            validate::required("runtime", &runtime)?;
            webroot.runtime = runtime;
        }
        if let Some(version) = req.runtime_version {
            validate::required("runtime_version", &version)?;
            webroot.runtime_version = version;
        }
        if let Some(config) = req.runtime_config {
            webroot.runtime_config = config_text(&config)?;
        }
        if let Some(folder) = req.public_folder {
            validate::relative_path("public_folder", &folder)?;
            webroot.public_folder = folder;
        }
        if let Some(name) = req.env_file_name {
            validate::required("env_file_name", &name)?;
            webroot.env_file_name = name;
        }

        let store = self.lifecycle.store();
        if !store.update_webroot(&webroot).await? {
            return Err(CoreError::not_found("webroot", id));
        }
        if let Some(env_vars) = &req.env_vars {
            store.replace_env_vars(id, env_vars).await?;
        }

        self.lifecycle.updated(&webroot).await?;
        Ok(webroot)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let webroot = self.get(id).await?;
        self.lifecycle.delete(&webroot).await
    }

    pub async fn retry(&self, id: &str) -> Result<()> {
        let webroot = self.get(id).await?;
        self.lifecycle.retry(&webroot).await
    }
}

fn config_text(config: &serde_json::Value) -> Result<String> {
    match config {
        serde_json::Value::Null => Ok("{}".to_string()),
        serde_json::Value::Object(_) => Ok(serde_json::to_string(config)?),
        _ => Err(CoreError::validation(
            "runtime_config",
            "must be a JSON object",
        )),
    }
}
