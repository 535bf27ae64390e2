// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQL shared by the PostgreSQL and SQLite stores.
//!
//! `sql_resource_store!` expands to the [`ResourceStore`](super::ResourceStore)
//! implementation for a struct holding a `pool` of the given database.
//! Every statement below is valid on both backends.

pub(crate) const SHARD_COLUMNS: &str = "id, cluster_id, name, role, lb_backend, status, created_at";
pub(crate) const NODE_COLUMNS: &str = "id, cluster_id, hostname, shard_id, status, created_at";
pub(crate) const TENANT_COLUMNS: &str = "id, name, uid, shard_id, sftp_enabled, ssh_enabled, status, status_message, created_at, updated_at";
pub(crate) const WEBROOT_COLUMNS: &str = "id, tenant_id, name, runtime, runtime_version, runtime_config, public_folder, env_file_name, status, status_message, created_at, updated_at";
pub(crate) const FQDN_COLUMNS: &str = "id, tenant_id, webroot_id, fqdn, ssl_enabled, status, status_message, created_at, updated_at";
pub(crate) const CRON_JOB_COLUMNS: &str = "id, tenant_id, webroot_id, name, schedule, command, working_directory, timeout_seconds, enabled, consecutive_failures, max_failures, status, status_message, created_at, updated_at";
pub(crate) const DAEMON_COLUMNS: &str = "id, tenant_id, webroot_id, node_id, name, command, proxy_path, proxy_port, num_procs, enabled, status, status_message, created_at, updated_at";
pub(crate) const SSH_KEY_COLUMNS: &str = "id, tenant_id, name, public_key, status, status_message, created_at, updated_at";
pub(crate) const DATABASE_COLUMNS: &str = "id, tenant_id, shard_id, name, status, status_message, created_at, updated_at";
pub(crate) const DATABASE_USER_COLUMNS: &str = "id, database_id, tenant_id, username, password, privileges, status, status_message, created_at, updated_at";
pub(crate) const VALKEY_INSTANCE_COLUMNS: &str = "id, tenant_id, shard_id, name, port, password, max_memory_mb, status, status_message, created_at, updated_at";
pub(crate) const VALKEY_USER_COLUMNS: &str = "id, valkey_instance_id, tenant_id, username, password, privileges, key_pattern, status, status_message, created_at, updated_at";
pub(crate) const S3_BUCKET_COLUMNS: &str = "id, tenant_id, shard_id, name, public, quota_bytes, status, status_message, created_at, updated_at";

/// `INSERT INTO {table} ({columns}) VALUES ($1, ..., $n)`, binding in column order.
pub(crate) fn insert_sql(table: &str, columns: &str) -> String {
    let n = columns.split(',').count();
    let params = (1..=n)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) VALUES ({})", table, columns, params)
}

/// `SELECT {columns} FROM {table} WHERE id = $1`
pub(crate) fn get_sql(table: &str, columns: &str) -> String {
    format!("SELECT {} FROM {} WHERE id = $1", columns, table)
}

/// `SELECT ... WHERE {parent} = $1 [AND status IN (...)] ORDER BY {order}`
pub(crate) fn list_sql(
    table: &str,
    columns: &str,
    parent: &str,
    statuses: &[crate::model::ResourceStatus],
    order: &str,
) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1{} ORDER BY {}",
        columns,
        table,
        parent,
        super::status_filter("status", 2, statuses),
        order
    )
}

macro_rules! sql_resource_store {
    ($store:ident, $db:ty) => {
        impl $store {
            /// Query rows of one parent, optionally filtered by status.
            fn list_query<'q, T>(
                sql: &'q str,
                parent_id: &'q str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> sqlx::query::QueryAs<'q, $db, T, <$db as sqlx::Database>::Arguments<'q>>
            where
                T: for<'r> sqlx::FromRow<'r, <$db as sqlx::Database>::Row>,
            {
                let mut query = sqlx::query_as::<$db, T>(sql).bind(parent_id);
                for status in statuses {
                    query = query.bind(status.as_str());
                }
                query
            }
        }

        #[async_trait::async_trait]
        impl $crate::store::ResourceStore for $store {
            async fn current_status(
                &self,
                kind: $crate::model::ResourceKind,
                id: &str,
            ) -> $crate::error::Result<Option<$crate::model::ResourceStatus>> {
                let sql = format!("SELECT status FROM {} WHERE id = $1", kind.table());
                let status: Option<String> = sqlx::query_scalar::<$db, String>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("read status"))?;
                status
                    .map($crate::model::ResourceStatus::try_from)
                    .transpose()
                    .map_err(|e| $crate::error::CoreError::Persistence {
                        operation: "read status".to_string(),
                        details: e.to_string(),
                    })
            }

            async fn transition(
                &self,
                kind: $crate::model::ResourceKind,
                id: &str,
                from: &[$crate::model::ResourceStatus],
                to: $crate::model::ResourceStatus,
                message: Option<&str>,
            ) -> $crate::error::Result<bool> {
                let sql = format!(
                    "UPDATE {} SET status = $1, status_message = $2, updated_at = $3 WHERE id = $4{}",
                    kind.table(),
                    $crate::store::status_filter("status", 5, from)
                );
                let mut query = sqlx::query::<$db>(&sql)
                    .bind(to.as_str())
                    .bind(message.map(str::to_string))
                    .bind(chrono::Utc::now())
                    .bind(id.to_string());
                for status in from {
                    query = query.bind(status.as_str());
                }
                let result = query
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("update status"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn set_enabled(
                &self,
                kind: $crate::model::ResourceKind,
                id: &str,
                enabled: bool,
                from: &[$crate::model::ResourceStatus],
                to: $crate::model::ResourceStatus,
            ) -> $crate::error::Result<bool> {
                use $crate::model::ResourceKind;
                let reset = match kind {
                    ResourceKind::CronJob if enabled => ", consecutive_failures = 0",
                    ResourceKind::CronJob | ResourceKind::Daemon => "",
                    other => {
                        return Err($crate::error::CoreError::validation(
                            "kind",
                            format!("{} cannot be enabled or disabled", other),
                        ));
                    }
                };
                let sql = format!(
                    "UPDATE {} SET enabled = $1, status = $2, status_message = NULL, updated_at = $3{} WHERE id = $4{}",
                    kind.table(),
                    reset,
                    $crate::store::status_filter("status", 5, from)
                );
                let mut query = sqlx::query::<$db>(&sql)
                    .bind(enabled)
                    .bind(to.as_str())
                    .bind(chrono::Utc::now())
                    .bind(id.to_string());
                for status in from {
                    query = query.bind(status.as_str());
                }
                let result = query
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("update enabled"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn delete_row(
                &self,
                kind: $crate::model::ResourceKind,
                id: &str,
            ) -> $crate::error::Result<bool> {
                let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
                let result = sqlx::query::<$db>(&sql)
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("delete row"))?;
                Ok(result.rows_affected() == 1)
            }

            // ================================================================
            // Shards and nodes
            // ================================================================

            async fn insert_shard(&self, shard: &$crate::model::ShardRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("shards", SHARD_COLUMNS))
                    .bind(&shard.id)
                    .bind(&shard.cluster_id)
                    .bind(&shard.name)
                    .bind(shard.role.as_str())
                    .bind(&shard.lb_backend)
                    .bind(&shard.status)
                    .bind(shard.created_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert shard"))?;
                Ok(())
            }

            async fn get_shard(&self, id: &str) -> $crate::error::Result<Option<$crate::model::ShardRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("shards", SHARD_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get shard"))
            }

            async fn list_shards(&self) -> $crate::error::Result<Vec<$crate::model::ShardRecord>> {
                use $crate::store::queries::*;
                let sql = format!("SELECT {} FROM shards ORDER BY cluster_id, name", SHARD_COLUMNS);
                sqlx::query_as::<$db, $crate::model::ShardRecord>(&sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list shards"))
            }

            async fn insert_node(&self, node: &$crate::model::NodeRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("nodes", NODE_COLUMNS))
                    .bind(&node.id)
                    .bind(&node.cluster_id)
                    .bind(&node.hostname)
                    .bind(&node.shard_id)
                    .bind(&node.status)
                    .bind(node.created_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert node"))?;
                Ok(())
            }

            async fn get_node(&self, id: &str) -> $crate::error::Result<Option<$crate::model::NodeRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("nodes", NODE_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get node"))
            }

            async fn list_nodes(&self, shard_id: &str) -> $crate::error::Result<Vec<$crate::model::NodeRecord>> {
                use $crate::store::queries::*;
                let sql = format!("SELECT {} FROM nodes WHERE shard_id = $1 ORDER BY id", NODE_COLUMNS);
                Self::list_query(&sql, shard_id, &[])
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list nodes"))
            }

            async fn set_node_status(&self, id: &str, status: &str) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>("UPDATE nodes SET status = $1 WHERE id = $2")
                    .bind(status.to_string())
                    .bind(id.to_string())
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("update node status"))?;
                Ok(result.rows_affected() == 1)
            }

            // ================================================================
            // Tenants
            // ================================================================

            async fn insert_tenant(
                &self,
                tenant: &$crate::model::TenantRecord,
            ) -> $crate::error::Result<$crate::model::TenantRecord> {
                use $crate::store::queries::*;
                let sql = format!(
                    r#"
                    INSERT INTO tenants (id, name, uid, shard_id, sftp_enabled, ssh_enabled, status, status_message, created_at, updated_at)
                    VALUES ($1, $2, (SELECT COALESCE(MAX(uid), 4999) + 1 FROM tenants), $3, $4, $5, $6, $7, $8, $9)
                    RETURNING {}
                    "#,
                    TENANT_COLUMNS
                );
                sqlx::query_as::<$db, $crate::model::TenantRecord>(&sql)
                    .bind(&tenant.id)
                    .bind(&tenant.name)
                    .bind(&tenant.shard_id)
                    .bind(tenant.sftp_enabled)
                    .bind(tenant.ssh_enabled)
                    .bind(tenant.status.as_str())
                    .bind(&tenant.status_message)
                    .bind(tenant.created_at)
                    .bind(tenant.updated_at)
                    .fetch_one(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert tenant"))
            }

            async fn get_tenant(&self, id: &str) -> $crate::error::Result<Option<$crate::model::TenantRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("tenants", TENANT_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get tenant"))
            }

            async fn list_tenants(&self) -> $crate::error::Result<Vec<$crate::model::TenantRecord>> {
                use $crate::store::queries::*;
                let sql = format!("SELECT {} FROM tenants ORDER BY name", TENANT_COLUMNS);
                sqlx::query_as::<$db, $crate::model::TenantRecord>(&sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list tenants"))
            }

            async fn list_tenants_on_shard(
                &self,
                shard_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::TenantRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("tenants", TENANT_COLUMNS, "shard_id", statuses, "name");
                Self::list_query(&sql, shard_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list tenants on shard"))
            }

            // ================================================================
            // Webroots
            // ================================================================

            async fn insert_webroot(&self, webroot: &$crate::model::WebrootRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("webroots", WEBROOT_COLUMNS))
                    .bind(&webroot.id)
                    .bind(&webroot.tenant_id)
                    .bind(&webroot.name)
                    .bind(&webroot.runtime)
                    .bind(&webroot.runtime_version)
                    .bind(&webroot.runtime_config)
                    .bind(&webroot.public_folder)
                    .bind(&webroot.env_file_name)
                    .bind(webroot.status.as_str())
                    .bind(&webroot.status_message)
                    .bind(webroot.created_at)
                    .bind(webroot.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert webroot"))?;
                Ok(())
            }

            async fn get_webroot(&self, id: &str) -> $crate::error::Result<Option<$crate::model::WebrootRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("webroots", WEBROOT_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get webroot"))
            }

            async fn list_webroots(
                &self,
                tenant_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::WebrootRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("webroots", WEBROOT_COLUMNS, "tenant_id", statuses, "name");
                Self::list_query(&sql, tenant_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list webroots"))
            }

            async fn update_webroot(&self, webroot: &$crate::model::WebrootRecord) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>(
                    r#"
                    UPDATE webroots
                    SET runtime = $2, runtime_version = $3, runtime_config = $4,
                        public_folder = $5, env_file_name = $6, updated_at = $7
                    WHERE id = $1
                    "#,
                )
                .bind(&webroot.id)
                .bind(&webroot.runtime)
                .bind(&webroot.runtime_version)
                .bind(&webroot.runtime_config)
                .bind(&webroot.public_folder)
                .bind(&webroot.env_file_name)
                .bind(chrono::Utc::now())
                .execute(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("update webroot"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn replace_env_vars(
                &self,
                webroot_id: &str,
                env_vars: &std::collections::BTreeMap<String, String>,
            ) -> $crate::error::Result<()> {
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err($crate::error::CoreError::persistence("begin env vars"))?;
                sqlx::query::<$db>("DELETE FROM webroot_env_vars WHERE webroot_id = $1")
                    .bind(webroot_id.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err($crate::error::CoreError::persistence("clear env vars"))?;
                for (name, value) in env_vars {
                    sqlx::query::<$db>(
                        "INSERT INTO webroot_env_vars (webroot_id, name, value) VALUES ($1, $2, $3)",
                    )
                    .bind(webroot_id.to_string())
                    .bind(name.clone())
                    .bind(value.clone())
                    .execute(&mut *tx)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert env var"))?;
                }
                tx.commit()
                    .await
                    .map_err($crate::error::CoreError::persistence("commit env vars"))
            }

            async fn list_env_vars(&self, webroot_id: &str) -> $crate::error::Result<Vec<$crate::model::EnvVarRecord>> {
                Self::list_query(
                    "SELECT webroot_id, name, value FROM webroot_env_vars WHERE webroot_id = $1 ORDER BY name",
                    webroot_id,
                    &[],
                )
                .fetch_all(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("list env vars"))
            }

            // ================================================================
            // FQDNs
            // ================================================================

            async fn insert_fqdn(&self, fqdn: &$crate::model::FqdnRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("fqdns", FQDN_COLUMNS))
                    .bind(&fqdn.id)
                    .bind(&fqdn.tenant_id)
                    .bind(&fqdn.webroot_id)
                    .bind(&fqdn.fqdn)
                    .bind(fqdn.ssl_enabled)
                    .bind(fqdn.status.as_str())
                    .bind(&fqdn.status_message)
                    .bind(fqdn.created_at)
                    .bind(fqdn.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert fqdn"))?;
                Ok(())
            }

            async fn get_fqdn(&self, id: &str) -> $crate::error::Result<Option<$crate::model::FqdnRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("fqdns", FQDN_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get fqdn"))
            }

            async fn list_fqdns(
                &self,
                webroot_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::FqdnRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("fqdns", FQDN_COLUMNS, "webroot_id", statuses, "fqdn");
                Self::list_query(&sql, webroot_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list fqdns"))
            }

            async fn list_fqdn_mappings(
                &self,
                cluster_id: &str,
                fqdn_statuses: &[$crate::model::ResourceStatus],
                tenant_statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::DesiredFqdnMapping>> {
                let fqdn_filter = $crate::store::status_filter("f.status", 2, fqdn_statuses);
                let tenant_filter = $crate::store::status_filter(
                    "t.status",
                    2 + fqdn_statuses.len(),
                    tenant_statuses,
                );
                let sql = format!(
                    r#"
                    SELECT f.fqdn AS fqdn, s.lb_backend AS lb_backend
                    FROM fqdns f
                    JOIN webroots w ON w.id = f.webroot_id
                    JOIN tenants t ON t.id = w.tenant_id
                    JOIN shards s ON s.id = t.shard_id
                    WHERE s.cluster_id = $1
                      AND s.role = 'web'{}{}
                    ORDER BY f.fqdn
                    "#,
                    fqdn_filter, tenant_filter
                );
                let mut query = sqlx::query_as::<$db, $crate::model::DesiredFqdnMapping>(&sql)
                    .bind(cluster_id.to_string());
                for status in fqdn_statuses.iter().chain(tenant_statuses) {
                    query = query.bind(status.as_str());
                }
                query
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list fqdn mappings"))
            }

            // ================================================================
            // Cron jobs
            // ================================================================

            async fn insert_cron_job(&self, job: &$crate::model::CronJobRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("cron_jobs", CRON_JOB_COLUMNS))
                    .bind(&job.id)
                    .bind(&job.tenant_id)
                    .bind(&job.webroot_id)
                    .bind(&job.name)
                    .bind(&job.schedule)
                    .bind(&job.command)
                    .bind(&job.working_directory)
                    .bind(job.timeout_seconds)
                    .bind(job.enabled)
                    .bind(job.consecutive_failures)
                    .bind(job.max_failures)
                    .bind(job.status.as_str())
                    .bind(&job.status_message)
                    .bind(job.created_at)
                    .bind(job.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert cron job"))?;
                Ok(())
            }

            async fn get_cron_job(&self, id: &str) -> $crate::error::Result<Option<$crate::model::CronJobRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("cron_jobs", CRON_JOB_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get cron job"))
            }

            async fn list_cron_jobs(
                &self,
                webroot_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::CronJobRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("cron_jobs", CRON_JOB_COLUMNS, "webroot_id", statuses, "name");
                Self::list_query(&sql, webroot_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list cron jobs"))
            }

            async fn update_cron_job(&self, job: &$crate::model::CronJobRecord) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>(
                    r#"
                    UPDATE cron_jobs
                    SET schedule = $2, command = $3, working_directory = $4,
                        timeout_seconds = $5, max_failures = $6, updated_at = $7
                    WHERE id = $1
                    "#,
                )
                .bind(&job.id)
                .bind(&job.schedule)
                .bind(&job.command)
                .bind(&job.working_directory)
                .bind(job.timeout_seconds)
                .bind(job.max_failures)
                .bind(chrono::Utc::now())
                .execute(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("update cron job"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn reset_cron_failures(&self, id: &str) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>(
                    "UPDATE cron_jobs SET consecutive_failures = 0, updated_at = $2 WHERE id = $1",
                )
                .bind(id.to_string())
                .bind(chrono::Utc::now())
                .execute(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("reset cron failures"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn increment_cron_failures(
                &self,
                id: &str,
            ) -> $crate::error::Result<Option<$crate::store::CronFailureCount>> {
                sqlx::query_as::<$db, $crate::store::CronFailureCount>(
                    r#"
                    UPDATE cron_jobs
                    SET consecutive_failures = consecutive_failures + 1, updated_at = $2
                    WHERE id = $1
                    RETURNING id, tenant_id, name, consecutive_failures, max_failures, enabled
                    "#,
                )
                .bind(id.to_string())
                .bind(chrono::Utc::now())
                .fetch_optional(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("increment cron failures"))
            }

            async fn auto_disable_cron_job(&self, id: &str, message: &str) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>(
                    r#"
                    UPDATE cron_jobs
                    SET enabled = $2, status = $3, status_message = $4, updated_at = $5
                    WHERE id = $1 AND enabled = $6 AND status = $7
                    "#,
                )
                .bind(id.to_string())
                .bind(false)
                .bind($crate::model::ResourceStatus::AutoDisabled.as_str())
                .bind(message.to_string())
                .bind(chrono::Utc::now())
                .bind(true)
                .bind($crate::model::ResourceStatus::Active.as_str())
                .execute(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("auto-disable cron job"))?;
                Ok(result.rows_affected() == 1)
            }

            // ================================================================
            // Daemons
            // ================================================================

            async fn insert_daemon(&self, daemon: &$crate::model::DaemonRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("daemons", DAEMON_COLUMNS))
                    .bind(&daemon.id)
                    .bind(&daemon.tenant_id)
                    .bind(&daemon.webroot_id)
                    .bind(&daemon.node_id)
                    .bind(&daemon.name)
                    .bind(&daemon.command)
                    .bind(&daemon.proxy_path)
                    .bind(daemon.proxy_port)
                    .bind(daemon.num_procs)
                    .bind(daemon.enabled)
                    .bind(daemon.status.as_str())
                    .bind(&daemon.status_message)
                    .bind(daemon.created_at)
                    .bind(daemon.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert daemon"))?;
                Ok(())
            }

            async fn get_daemon(&self, id: &str) -> $crate::error::Result<Option<$crate::model::DaemonRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("daemons", DAEMON_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get daemon"))
            }

            async fn list_daemons(
                &self,
                webroot_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::DaemonRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("daemons", DAEMON_COLUMNS, "webroot_id", statuses, "name");
                Self::list_query(&sql, webroot_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list daemons"))
            }

            async fn update_daemon(&self, daemon: &$crate::model::DaemonRecord) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>(
                    r#"
                    UPDATE daemons
                    SET command = $2, proxy_path = $3, proxy_port = $4, num_procs = $5, updated_at = $6
                    WHERE id = $1
                    "#,
                )
                .bind(&daemon.id)
                .bind(&daemon.command)
                .bind(&daemon.proxy_path)
                .bind(daemon.proxy_port)
                .bind(daemon.num_procs)
                .bind(chrono::Utc::now())
                .execute(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("update daemon"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn least_loaded_node(&self, shard_id: &str) -> $crate::error::Result<Option<String>> {
                sqlx::query_scalar::<$db, String>(
                    r#"
                    SELECT n.id
                    FROM nodes n
                    LEFT JOIN daemons d ON d.node_id = n.id
                    WHERE n.shard_id = $1 AND n.status = 'active'
                    GROUP BY n.id
                    ORDER BY COUNT(d.id) ASC, n.id ASC
                    LIMIT 1
                    "#,
                )
                .bind(shard_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("select least loaded node"))
            }

            // ================================================================
            // SSH keys
            // ================================================================

            async fn insert_ssh_key(&self, key: &$crate::model::SshKeyRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("ssh_keys", SSH_KEY_COLUMNS))
                    .bind(&key.id)
                    .bind(&key.tenant_id)
                    .bind(&key.name)
                    .bind(&key.public_key)
                    .bind(key.status.as_str())
                    .bind(&key.status_message)
                    .bind(key.created_at)
                    .bind(key.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert ssh key"))?;
                Ok(())
            }

            async fn get_ssh_key(&self, id: &str) -> $crate::error::Result<Option<$crate::model::SshKeyRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("ssh_keys", SSH_KEY_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get ssh key"))
            }

            async fn list_ssh_keys(
                &self,
                tenant_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::SshKeyRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("ssh_keys", SSH_KEY_COLUMNS, "tenant_id", statuses, "name");
                Self::list_query(&sql, tenant_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list ssh keys"))
            }

            // ================================================================
            // Databases
            // ================================================================

            async fn insert_database(&self, database: &$crate::model::DatabaseRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("databases", DATABASE_COLUMNS))
                    .bind(&database.id)
                    .bind(&database.tenant_id)
                    .bind(&database.shard_id)
                    .bind(&database.name)
                    .bind(database.status.as_str())
                    .bind(&database.status_message)
                    .bind(database.created_at)
                    .bind(database.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert database"))?;
                Ok(())
            }

            async fn get_database(&self, id: &str) -> $crate::error::Result<Option<$crate::model::DatabaseRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("databases", DATABASE_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get database"))
            }

            async fn list_databases(
                &self,
                shard_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::DatabaseRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("databases", DATABASE_COLUMNS, "shard_id", statuses, "name");
                Self::list_query(&sql, shard_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list databases"))
            }

            async fn insert_database_user(&self, user: &$crate::model::DatabaseUserRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("database_users", DATABASE_USER_COLUMNS))
                    .bind(&user.id)
                    .bind(&user.database_id)
                    .bind(&user.tenant_id)
                    .bind(&user.username)
                    .bind(&user.password)
                    .bind(user.privileges.to_column())
                    .bind(user.status.as_str())
                    .bind(&user.status_message)
                    .bind(user.created_at)
                    .bind(user.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert database user"))?;
                Ok(())
            }

            async fn get_database_user(&self, id: &str) -> $crate::error::Result<Option<$crate::model::DatabaseUserRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("database_users", DATABASE_USER_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get database user"))
            }

            async fn list_database_users(
                &self,
                database_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::DatabaseUserRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("database_users", DATABASE_USER_COLUMNS, "database_id", statuses, "username");
                Self::list_query(&sql, database_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list database users"))
            }

            // ================================================================
            // Valkey
            // ================================================================

            async fn insert_valkey_instance(&self, instance: &$crate::model::ValkeyInstanceRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("valkey_instances", VALKEY_INSTANCE_COLUMNS))
                    .bind(&instance.id)
                    .bind(&instance.tenant_id)
                    .bind(&instance.shard_id)
                    .bind(&instance.name)
                    .bind(instance.port)
                    .bind(&instance.password)
                    .bind(instance.max_memory_mb)
                    .bind(instance.status.as_str())
                    .bind(&instance.status_message)
                    .bind(instance.created_at)
                    .bind(instance.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert valkey instance"))?;
                Ok(())
            }

            async fn get_valkey_instance(&self, id: &str) -> $crate::error::Result<Option<$crate::model::ValkeyInstanceRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("valkey_instances", VALKEY_INSTANCE_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get valkey instance"))
            }

            async fn list_valkey_instances(
                &self,
                shard_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::ValkeyInstanceRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("valkey_instances", VALKEY_INSTANCE_COLUMNS, "shard_id", statuses, "name");
                Self::list_query(&sql, shard_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list valkey instances"))
            }

            async fn next_valkey_port(&self, shard_id: &str) -> $crate::error::Result<i32> {
                sqlx::query_scalar::<$db, i32>(
                    "SELECT COALESCE(MAX(port), 6379) + 1 FROM valkey_instances WHERE shard_id = $1",
                )
                .bind(shard_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err($crate::error::CoreError::persistence("allocate valkey port"))
            }

            async fn insert_valkey_user(&self, user: &$crate::model::ValkeyUserRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("valkey_users", VALKEY_USER_COLUMNS))
                    .bind(&user.id)
                    .bind(&user.valkey_instance_id)
                    .bind(&user.tenant_id)
                    .bind(&user.username)
                    .bind(&user.password)
                    .bind(user.privileges.to_column())
                    .bind(&user.key_pattern)
                    .bind(user.status.as_str())
                    .bind(&user.status_message)
                    .bind(user.created_at)
                    .bind(user.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert valkey user"))?;
                Ok(())
            }

            async fn get_valkey_user(&self, id: &str) -> $crate::error::Result<Option<$crate::model::ValkeyUserRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("valkey_users", VALKEY_USER_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get valkey user"))
            }

            async fn list_valkey_users(
                &self,
                instance_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::ValkeyUserRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("valkey_users", VALKEY_USER_COLUMNS, "valkey_instance_id", statuses, "username");
                Self::list_query(&sql, instance_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list valkey users"))
            }

            // ================================================================
            // S3 buckets
            // ================================================================

            async fn insert_s3_bucket(&self, bucket: &$crate::model::S3BucketRecord) -> $crate::error::Result<()> {
                use $crate::store::queries::*;
                sqlx::query::<$db>(&insert_sql("s3_buckets", S3_BUCKET_COLUMNS))
                    .bind(&bucket.id)
                    .bind(&bucket.tenant_id)
                    .bind(&bucket.shard_id)
                    .bind(&bucket.name)
                    .bind(bucket.public)
                    .bind(bucket.quota_bytes)
                    .bind(bucket.status.as_str())
                    .bind(&bucket.status_message)
                    .bind(bucket.created_at)
                    .bind(bucket.updated_at)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("insert s3 bucket"))?;
                Ok(())
            }

            async fn get_s3_bucket(&self, id: &str) -> $crate::error::Result<Option<$crate::model::S3BucketRecord>> {
                use $crate::store::queries::*;
                sqlx::query_as::<$db, _>(&get_sql("s3_buckets", S3_BUCKET_COLUMNS))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("get s3 bucket"))
            }

            async fn list_s3_buckets(
                &self,
                shard_id: &str,
                statuses: &[$crate::model::ResourceStatus],
            ) -> $crate::error::Result<Vec<$crate::model::S3BucketRecord>> {
                use $crate::store::queries::*;
                let sql = list_sql("s3_buckets", S3_BUCKET_COLUMNS, "shard_id", statuses, "name");
                Self::list_query(&sql, shard_id, statuses)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::CoreError::persistence("list s3 buckets"))
            }
        }
    };
}

pub(crate) use sql_resource_store;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql_binds_every_column() {
        assert_eq!(
            insert_sql("nodes", NODE_COLUMNS),
            "INSERT INTO nodes (id, cluster_id, hostname, shard_id, status, created_at) VALUES ($1, $2, $3, $4, $5, $6)"
        );
    }

    #[test]
    fn test_list_sql_with_filter() {
        let sql = list_sql(
            "webroots",
            "id",
            "tenant_id",
            &[crate::model::ResourceStatus::Active],
            "name",
        );
        assert_eq!(
            sql,
            "SELECT id FROM webroots WHERE tenant_id = $1 AND status IN ($2) ORDER BY name"
        );
    }
}
