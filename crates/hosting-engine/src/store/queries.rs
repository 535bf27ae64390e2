// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQL shared by the PostgreSQL and SQLite outbox stores.

pub(crate) const EXECUTION_COLUMNS: &str = "execution_id, tenant_id, workflow_type, task_queue, status, claimed_by, lease_expires_at, started_at, updated_at";
pub(crate) const SIGNAL_COLUMNS: &str = "seq, execution_id, signal_name, workflow_name, workflow_id, resource_type, resource_id, arg, state, error, created_at, processed_at";

/// Insert a new execution, or reopen a closed one. Returns a row only when
/// the execution was started by this statement.
pub(crate) const UPSERT_EXECUTION: &str = r#"
    INSERT INTO entity_executions
        (execution_id, tenant_id, workflow_type, task_queue, status, started_at, updated_at)
    VALUES ($1, $2, $3, $4, 'running', $5, $5)
    ON CONFLICT (execution_id) DO UPDATE
    SET status = 'running',
        workflow_type = $3,
        task_queue = $4,
        claimed_by = NULL,
        lease_expires_at = NULL,
        started_at = $5,
        updated_at = $5
    WHERE entity_executions.status = 'closed'
    RETURNING execution_id
"#;

/// Append a signal. The partial unique index on pending
/// `(workflow_name, workflow_id)` turns a duplicate into a no-op.
pub(crate) const INSERT_SIGNAL: &str = r#"
    INSERT INTO provision_signals
        (execution_id, signal_name, workflow_name, workflow_id, resource_type, resource_id, arg, state, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
    ON CONFLICT DO NOTHING
"#;

pub(crate) const REOPEN_ORPHANED: &str = r#"
    UPDATE entity_executions
    SET status = 'running', claimed_by = NULL, lease_expires_at = NULL, updated_at = $1
    WHERE status = 'closed'
      AND EXISTS (
          SELECT 1 FROM provision_signals s
          WHERE s.execution_id = entity_executions.execution_id AND s.state = 'pending'
      )
"#;

/// Compare-and-swap claim of the least recently touched claimable execution.
/// The claimability condition is repeated on the outer update so that two
/// workers racing for the same row cannot both win.
pub(crate) fn claim_sql() -> String {
    let claimable = "status = 'running' AND (claimed_by IS NULL OR lease_expires_at IS NULL OR lease_expires_at < $3)";
    format!(
        "UPDATE entity_executions SET claimed_by = $1, lease_expires_at = $2, updated_at = $3 \
         WHERE execution_id = (SELECT execution_id FROM entity_executions WHERE {claimable} \
         ORDER BY updated_at, execution_id LIMIT 1) AND {claimable} \
         RETURNING {EXECUTION_COLUMNS}"
    )
}

pub(crate) const COMPLETE_SIGNAL: &str = r#"
    UPDATE provision_signals
    SET state = $1, error = $2, processed_at = $3
    WHERE seq = $4 AND state = 'pending'
"#;

pub(crate) const RENEW_LEASE: &str = r#"
    UPDATE entity_executions
    SET lease_expires_at = $1, updated_at = $2
    WHERE execution_id = $3 AND claimed_by = $4 AND status = 'running'
"#;

pub(crate) const CLOSE_IF_DRAINED: &str = r#"
    UPDATE entity_executions
    SET status = 'closed', claimed_by = NULL, lease_expires_at = NULL, updated_at = $1
    WHERE execution_id = $2
      AND claimed_by = $3
      AND NOT EXISTS (
          SELECT 1 FROM provision_signals
          WHERE execution_id = $2 AND state = 'pending'
      )
"#;

pub(crate) const RELEASE: &str = r#"
    UPDATE entity_executions
    SET claimed_by = NULL, lease_expires_at = NULL, updated_at = $1
    WHERE execution_id = $2 AND claimed_by = $3
"#;

/// Delete a batch of processed signals older than the cutoff.
pub(crate) const PRUNE_SIGNALS: &str = r#"
    DELETE FROM provision_signals
    WHERE seq IN (
        SELECT seq FROM provision_signals
        WHERE state <> 'pending' AND processed_at < $1
        ORDER BY seq
        LIMIT $2
    )
    AND state <> 'pending'
"#;

/// Delete a batch of drained, closed executions older than the cutoff. The
/// conditions are repeated on the outer delete so an execution reopened by a
/// concurrent `signal_with_start` survives.
pub(crate) const PRUNE_EXECUTIONS: &str = r#"
    DELETE FROM entity_executions
    WHERE execution_id IN (
        SELECT e.execution_id FROM entity_executions e
        WHERE e.status = 'closed'
          AND e.updated_at < $1
          AND NOT EXISTS (
              SELECT 1 FROM provision_signals s
              WHERE s.execution_id = e.execution_id AND s.state = 'pending'
          )
        ORDER BY e.updated_at
        LIMIT $2
    )
    AND status = 'closed'
    AND updated_at < $1
    AND NOT EXISTS (
        SELECT 1 FROM provision_signals s
        WHERE s.execution_id = entity_executions.execution_id AND s.state = 'pending'
    )
"#;

macro_rules! sql_outbox_store {
    ($store:ident, $db:ty) => {
        #[async_trait::async_trait]
        impl $crate::store::OutboxStore for $store {
            async fn signal_with_start(
                &self,
                start: &hosting_core::engine::StartOptions,
                signal: &str,
                task: &hosting_core::model::ProvisionTask,
            ) -> $crate::error::Result<hosting_core::engine::SignalOutcome> {
                use $crate::error::OutboxError;
                use $crate::store::queries::*;

                let now = chrono::Utc::now();
                let arg = task.arg.to_string();
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(OutboxError::database("begin signal_with_start"))?;

                let started = sqlx::query_scalar::<$db, String>(UPSERT_EXECUTION)
                    .bind(&start.execution_id)
                    .bind(&start.tenant_id)
                    .bind(&start.workflow_type)
                    .bind(&start.task_queue)
                    .bind(now)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(OutboxError::database("upsert execution"))?
                    .is_some();

                let inserted = sqlx::query::<$db>(INSERT_SIGNAL)
                    .bind(&start.execution_id)
                    .bind(signal)
                    .bind(&task.workflow_name)
                    .bind(&task.workflow_id)
                    .bind(&task.resource_type)
                    .bind(&task.resource_id)
                    .bind(arg)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(OutboxError::database("insert signal"))?
                    .rows_affected();

                tx.commit()
                    .await
                    .map_err(OutboxError::database("commit signal_with_start"))?;

                Ok(hosting_core::engine::SignalOutcome {
                    started,
                    deduplicated: inserted == 0,
                })
            }

            async fn reopen_orphaned(&self) -> $crate::error::Result<u64> {
                let result = sqlx::query::<$db>($crate::store::queries::REOPEN_ORPHANED)
                    .bind(chrono::Utc::now())
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("reopen orphaned"))?;
                Ok(result.rows_affected())
            }

            async fn claim_execution(
                &self,
                worker_id: &str,
                lease: std::time::Duration,
            ) -> $crate::error::Result<Option<$crate::store::ExecutionRecord>> {
                let sql = $crate::store::queries::claim_sql();
                sqlx::query_as::<$db, $crate::store::ExecutionRecord>(&sql)
                    .bind(worker_id)
                    .bind($crate::store::lease_deadline(lease))
                    .bind(chrono::Utc::now())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("claim execution"))
            }

            async fn next_pending(
                &self,
                execution_id: &str,
            ) -> $crate::error::Result<Option<$crate::store::SignalRecord>> {
                let sql = format!(
                    "SELECT {} FROM provision_signals WHERE execution_id = $1 AND state = 'pending' ORDER BY seq LIMIT 1",
                    $crate::store::queries::SIGNAL_COLUMNS
                );
                sqlx::query_as::<$db, $crate::store::SignalRecord>(&sql)
                    .bind(execution_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("next pending signal"))
            }

            async fn complete_signal(
                &self,
                seq: i64,
                error: Option<&str>,
            ) -> $crate::error::Result<()> {
                let state = match error {
                    None => $crate::store::SIGNAL_DONE,
                    Some(_) => $crate::store::SIGNAL_FAILED,
                };
                sqlx::query::<$db>($crate::store::queries::COMPLETE_SIGNAL)
                    .bind(state)
                    .bind(error.map(str::to_string))
                    .bind(chrono::Utc::now())
                    .bind(seq)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("complete signal"))?;
                Ok(())
            }

            async fn renew_lease(
                &self,
                execution_id: &str,
                worker_id: &str,
                lease: std::time::Duration,
            ) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>($crate::store::queries::RENEW_LEASE)
                    .bind($crate::store::lease_deadline(lease))
                    .bind(chrono::Utc::now())
                    .bind(execution_id)
                    .bind(worker_id)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("renew lease"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn close_if_drained(
                &self,
                execution_id: &str,
                worker_id: &str,
            ) -> $crate::error::Result<bool> {
                let result = sqlx::query::<$db>($crate::store::queries::CLOSE_IF_DRAINED)
                    .bind(chrono::Utc::now())
                    .bind(execution_id)
                    .bind(worker_id)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("close execution"))?;
                Ok(result.rows_affected() == 1)
            }

            async fn release(&self, execution_id: &str, worker_id: &str) -> $crate::error::Result<()> {
                sqlx::query::<$db>($crate::store::queries::RELEASE)
                    .bind(chrono::Utc::now())
                    .bind(execution_id)
                    .bind(worker_id)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("release execution"))?;
                Ok(())
            }

            async fn prune_signals(
                &self,
                cutoff: chrono::DateTime<chrono::Utc>,
                limit: i64,
            ) -> $crate::error::Result<u64> {
                let result = sqlx::query::<$db>($crate::store::queries::PRUNE_SIGNALS)
                    .bind(cutoff)
                    .bind(limit)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("prune signals"))?;
                Ok(result.rows_affected())
            }

            async fn prune_executions(
                &self,
                cutoff: chrono::DateTime<chrono::Utc>,
                limit: i64,
            ) -> $crate::error::Result<u64> {
                let result = sqlx::query::<$db>($crate::store::queries::PRUNE_EXECUTIONS)
                    .bind(cutoff)
                    .bind(limit)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("prune executions"))?;
                Ok(result.rows_affected())
            }

            async fn get_execution(
                &self,
                execution_id: &str,
            ) -> $crate::error::Result<Option<$crate::store::ExecutionRecord>> {
                let sql = format!(
                    "SELECT {} FROM entity_executions WHERE execution_id = $1",
                    $crate::store::queries::EXECUTION_COLUMNS
                );
                sqlx::query_as::<$db, $crate::store::ExecutionRecord>(&sql)
                    .bind(execution_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("get execution"))
            }

            async fn list_signals(
                &self,
                execution_id: &str,
            ) -> $crate::error::Result<Vec<$crate::store::SignalRecord>> {
                let sql = format!(
                    "SELECT {} FROM provision_signals WHERE execution_id = $1 ORDER BY seq",
                    $crate::store::queries::SIGNAL_COLUMNS
                );
                sqlx::query_as::<$db, $crate::store::SignalRecord>(&sql)
                    .bind(execution_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::error::OutboxError::database("list signals"))
            }
        }
    };
}

pub(crate) use sql_outbox_store;
