// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock engine for testing.
//!
//! Records every call and simulates entity executions in memory. Executions
//! never complete on their own, so a task stays pending until
//! [`MockEngine::complete`] is called for its workflow ID.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{EngineError, SignalOutcome, StartOptions, WorkflowEngine};
use crate::model::ProvisionTask;

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SignalWithStart {
        start: StartOptions,
        signal: String,
        task: ProvisionTask,
    },
    StartWorkflow {
        task_queue: String,
        task: ProvisionTask,
    },
}

impl RecordedCall {
    pub fn task(&self) -> &ProvisionTask {
        match self {
            Self::SignalWithStart { task, .. } | Self::StartWorkflow { task, .. } => task,
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    /// execution ID -> queued workflow IDs
    executions: HashMap<String, Vec<String>>,
    pending: HashSet<String>,
    failure: Option<EngineError>,
}

/// In-memory [`WorkflowEngine`].
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    /// Create a mock engine that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock engine that reports itself unreachable.
    pub fn failing() -> Self {
        let state = MockState {
            failure: Some(EngineError::Unavailable("connection refused".to_string())),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make subsequent calls fail with `error`, or succeed again with `None`.
    pub async fn set_failure(&self, error: Option<EngineError>) {
        self.state.lock().await.failure = error;
    }

    /// Every call received, including rejected ones.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Tasks received, in order.
    pub async fn tasks(&self) -> Vec<ProvisionTask> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .map(|c| c.task().clone())
            .collect()
    }

    /// Workflow names received, in order.
    pub async fn workflow_names(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .map(|c| c.task().workflow_name.clone())
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Workflow IDs queued on an execution, in delivery order.
    pub async fn queued(&self, execution_id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .executions
            .get(execution_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mark a workflow as finished so its ID may be submitted again.
    pub async fn complete(&self, workflow_id: &str) {
        self.state.lock().await.pending.remove(workflow_id);
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.calls.clear();
        state.executions.clear();
        state.pending.clear();
    }
}

impl MockState {
    fn enqueue(&mut self, execution_id: &str, task: &ProvisionTask) -> SignalOutcome {
        let started = !self.executions.contains_key(execution_id);
        let deduplicated = !self.pending.insert(task.workflow_id.clone());
        if !deduplicated {
            self.executions
                .entry(execution_id.to_string())
                .or_default()
                .push(task.workflow_id.clone());
        } else {
            self.executions.entry(execution_id.to_string()).or_default();
        }
        SignalOutcome {
            started,
            deduplicated,
        }
    }
}

#[async_trait]
impl WorkflowEngine for MockEngine {
    async fn signal_with_start(
        &self,
        start: &StartOptions,
        signal: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome, EngineError> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedCall::SignalWithStart {
            start: start.clone(),
            signal: signal.to_string(),
            task: task.clone(),
        });
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        Ok(state.enqueue(&start.execution_id, task))
    }

    async fn start_workflow(
        &self,
        task_queue: &str,
        task: &ProvisionTask,
    ) -> Result<SignalOutcome, EngineError> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedCall::StartWorkflow {
            task_queue: task_queue.to_string(),
            task: task.clone(),
        });
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        let execution_id = task.workflow_id.clone();
        Ok(state.enqueue(&execution_id, task))
    }

    fn engine_type(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(workflow_id: &str) -> ProvisionTask {
        ProvisionTask {
            workflow_name: "CreateWebrootWorkflow".into(),
            workflow_id: workflow_id.into(),
            arg: serde_json::json!({}),
            resource_type: "webroot".into(),
            resource_id: "w1".into(),
        }
    }

    fn start(execution_id: &str) -> StartOptions {
        StartOptions {
            execution_id: execution_id.into(),
            workflow_type: "TenantProvisionWorkflow".into(),
            task_queue: "hosting-tasks".into(),
            tenant_id: Some("t1".into()),
        }
    }

    #[tokio::test]
    async fn test_first_signal_starts_execution() {
        let engine = MockEngine::new();
        let first = engine
            .signal_with_start(&start("tenant-t1"), "provision", &task("a"))
            .await
            .unwrap();
        let second = engine
            .signal_with_start(&start("tenant-t1"), "provision", &task("b"))
            .await
            .unwrap();

        assert!(first.started);
        assert!(!second.started);
        assert_eq!(engine.queued("tenant-t1").await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_pending_task_is_deduplicated() {
        let engine = MockEngine::new();
        engine
            .signal_with_start(&start("tenant-t1"), "provision", &task("a"))
            .await
            .unwrap();
        let dup = engine
            .signal_with_start(&start("tenant-t1"), "provision", &task("a"))
            .await
            .unwrap();
        assert!(dup.deduplicated);
        assert_eq!(engine.queued("tenant-t1").await, vec!["a"]);

        engine.complete("a").await;
        let again = engine
            .signal_with_start(&start("tenant-t1"), "provision", &task("a"))
            .await
            .unwrap();
        assert!(!again.deduplicated);
    }

    #[tokio::test]
    async fn test_failing_engine_still_records_call() {
        let engine = MockEngine::failing();
        let err = engine
            .start_workflow("hosting-tasks", &task("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
        assert_eq!(engine.call_count().await, 1);
    }
}
