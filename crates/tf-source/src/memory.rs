//! In-memory trace source — pre-loaded traces for tests and embedding.

use crate::{SourceError, TraceSource};
use async_trait::async_trait;
use std::collections::HashMap;
use tf_core::trace::ExecutionTrace;

/// A trace source backed by a fixed map of traces, keyed by execution id.
#[derive(Debug, Default)]
pub struct InMemoryTraceSource {
    traces: HashMap<String, ExecutionTrace>,
}

impl InMemoryTraceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trace under its own execution id.
    pub fn insert(&mut self, trace: ExecutionTrace) {
        self.traces.insert(trace.execution_id.clone(), trace);
    }
}

impl FromIterator<ExecutionTrace> for InMemoryTraceSource {
    fn from_iter<I: IntoIterator<Item = ExecutionTrace>>(iter: I) -> Self {
        let mut source = Self::new();
        for trace in iter {
            source.insert(trace);
        }
        source
    }
}

#[async_trait]
impl TraceSource for InMemoryTraceSource {
    async fn fetch(&self, execution_id: &str) -> Result<ExecutionTrace, SourceError> {
        self.traces
            .get(execution_id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownExecution(execution_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tf_core::trace::{TaskRecord, TaskType};

    #[tokio::test]
    async fn fetch_returns_registered_trace() {
        let source: InMemoryTraceSource = [ExecutionTrace::new(
            "wf-1",
            vec![TaskRecord::new(
                "t1",
                TaskType::Simple,
                serde_json::json!({}),
            )],
        )]
        .into_iter()
        .collect();

        let trace = source.fetch("wf-1").await.unwrap();
        assert_eq!(trace.execution_id, "wf-1");
        assert_eq!(trace.tasks.len(), 1);
    }

    #[tokio::test]
    async fn fetch_unknown_execution_fails() {
        let source = InMemoryTraceSource::new();
        let err = source.fetch("wf-missing").await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownExecution(id) if id == "wf-missing"));
    }
}
