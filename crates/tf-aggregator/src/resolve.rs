//! Sub-workflow resolution — classify a loop body item and recursively
//! flatten nested executions into (canonical name, output) pairs.

use crate::AggregateError;
use async_recursion::async_recursion;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tf_core::name::canonical_name;
use tf_core::trace::{sub_workflow_execution_id, TaskType, SUB_WORKFLOW_ID_FIELD};
use tf_source::TraceSource;

/// Body items with this reference-name prefix are reported as single
/// synthetic results even when they carry a nested execution id.
pub const RESERVED_LEAF_PREFIX: &str = "sub_workflow";

/// Resolves loop body items for one collect call. Carries the visited set
/// guarding against cyclic nested-execution references; the set is seeded
/// with the root execution id and discarded with the resolver.
pub struct SubWorkflowResolver {
    source: Arc<dyn TraceSource>,
    visited: Mutex<HashSet<String>>,
}

impl SubWorkflowResolver {
    pub fn new(source: Arc<dyn TraceSource>, root_execution_id: &str) -> Self {
        let mut visited = HashSet::new();
        visited.insert(root_execution_id.to_string());
        Self {
            source,
            visited: Mutex::new(visited),
        }
    }

    /// Classify one body item, first match wins:
    ///
    /// 1. reserved leaf prefix + nested id → one pair with the id stripped,
    ///    no recursion;
    /// 2. nested id → fetch the referenced trace and flatten it depth-first;
    /// 3. otherwise → one pair, unchanged.
    #[async_recursion]
    pub async fn resolve(
        &self,
        body_reference_name: &str,
        body_output: &Value,
    ) -> Result<Vec<(String, Value)>, AggregateError> {
        match sub_workflow_execution_id(body_output) {
            Some(_) if body_reference_name.starts_with(RESERVED_LEAF_PREFIX) => Ok(vec![(
                canonical_name(body_reference_name).to_string(),
                strip_execution_id(body_output),
            )]),
            Some(execution_id) => self.expand(execution_id).await,
            None => Ok(vec![(
                canonical_name(body_reference_name).to_string(),
                body_output.clone(),
            )]),
        }
    }

    /// Fetch a nested execution and flatten its tasks in trace order.
    /// Do-while tasks inside a nested trace are skipped: their aggregates
    /// are only collected by an explicit top-level call on that loop.
    async fn expand(&self, execution_id: &str) -> Result<Vec<(String, Value)>, AggregateError> {
        self.mark_visited(execution_id)?;

        let trace = self
            .source
            .fetch(execution_id)
            .await
            .map_err(|source| AggregateError::Fetch {
                execution_id: execution_id.to_string(),
                source,
            })?;
        tracing::debug!(
            execution_id,
            tasks = trace.tasks.len(),
            "expanding nested execution"
        );

        let mut pairs = Vec::new();
        for task in &trace.tasks {
            if task.task_type == TaskType::DoWhile {
                continue;
            }
            pairs.extend(self.resolve(&task.reference_name, &task.output_data).await?);
        }
        Ok(pairs)
    }

    fn mark_visited(&self, execution_id: &str) -> Result<(), AggregateError> {
        let mut visited = self
            .visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !visited.insert(execution_id.to_string()) {
            return Err(AggregateError::Cycle(execution_id.to_string()));
        }
        Ok(())
    }
}

fn strip_execution_id(output: &Value) -> Value {
    match output {
        Value::Object(fields) => {
            let mut stripped = fields.clone();
            stripped.remove(SUB_WORKFLOW_ID_FIELD);
            Value::Object(stripped)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tf_core::prelude::*;
    use tf_source::InMemoryTraceSource;

    fn resolver_with(traces: Vec<ExecutionTrace>) -> SubWorkflowResolver {
        let source: Arc<dyn TraceSource> =
            Arc::new(traces.into_iter().collect::<InMemoryTraceSource>());
        SubWorkflowResolver::new(source, "root")
    }

    #[tokio::test]
    async fn plain_leaf_is_canonicalized_and_passed_through() {
        let resolver = resolver_with(vec![]);
        let pairs = resolver
            .resolve("task_a__3f2b", &json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(pairs, vec![("task_a".to_string(), json!({"x": 1}))]);
    }

    #[tokio::test]
    async fn reserved_prefix_stays_a_leaf_with_id_stripped() {
        // No trace for wf-9 is registered: a fetch attempt would fail, so a
        // passing resolve proves no recursion happened.
        let resolver = resolver_with(vec![]);
        let pairs = resolver
            .resolve(
                "sub_workflow_report",
                &json!({"subWorkflowExecutionId": "wf-9", "summary": "done"}),
            )
            .await
            .unwrap();
        assert_eq!(
            pairs,
            vec![("sub_workflow_report".to_string(), json!({"summary": "done"}))]
        );
    }

    #[tokio::test]
    async fn nested_execution_is_flattened_in_trace_order() {
        let resolver = resolver_with(vec![ExecutionTrace::new(
            "wf-42",
            vec![
                TaskRecord::new("step1__a1", TaskType::Simple, json!({"y": 5})),
                TaskRecord::new(
                    "step2",
                    TaskType::DoWhile,
                    json!({"iteration": 1, "1": {"inner": {"z": 9}}}),
                ),
                TaskRecord::new("step3", TaskType::Simple, json!({"y": 6})),
            ],
        )]);

        let pairs = resolver
            .resolve("call_pipeline", &json!({"subWorkflowExecutionId": "wf-42"}))
            .await
            .unwrap();

        // step2 is a nested do-while and is skipped entirely.
        assert_eq!(
            pairs,
            vec![
                ("step1".to_string(), json!({"y": 5})),
                ("step3".to_string(), json!({"y": 6})),
            ]
        );
    }

    #[tokio::test]
    async fn nested_traces_recurse_depth_first() {
        let resolver = resolver_with(vec![
            ExecutionTrace::new(
                "wf-outer",
                vec![
                    TaskRecord::new("before", TaskType::Simple, json!({"n": 1})),
                    TaskRecord::new(
                        "call_inner",
                        TaskType::SubWorkflow,
                        json!({"subWorkflowExecutionId": "wf-inner"}),
                    ),
                    TaskRecord::new("after", TaskType::Simple, json!({"n": 4})),
                ],
            ),
            ExecutionTrace::new(
                "wf-inner",
                vec![
                    TaskRecord::new("deep1", TaskType::Simple, json!({"n": 2})),
                    TaskRecord::new("deep2", TaskType::Simple, json!({"n": 3})),
                ],
            ),
        ]);

        let pairs = resolver
            .resolve("call_outer", &json!({"subWorkflowExecutionId": "wf-outer"}))
            .await
            .unwrap();

        let names: Vec<_> = pairs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["before", "deep1", "deep2", "after"]);
    }

    #[tokio::test]
    async fn reserved_prefix_applies_inside_nested_traces_too() {
        let resolver = resolver_with(vec![ExecutionTrace::new(
            "wf-1",
            vec![TaskRecord::new(
                "sub_workflow_summary__9c",
                TaskType::SubWorkflow,
                json!({"subWorkflowExecutionId": "wf-never-fetched", "total": 7}),
            )],
        )]);

        let pairs = resolver
            .resolve("call", &json!({"subWorkflowExecutionId": "wf-1"}))
            .await
            .unwrap();
        assert_eq!(
            pairs,
            vec![("sub_workflow_summary".to_string(), json!({"total": 7}))]
        );
    }

    #[tokio::test]
    async fn cycle_between_nested_executions_is_detected() {
        let resolver = resolver_with(vec![
            ExecutionTrace::new(
                "wf-a",
                vec![TaskRecord::new(
                    "call_b",
                    TaskType::SubWorkflow,
                    json!({"subWorkflowExecutionId": "wf-b"}),
                )],
            ),
            ExecutionTrace::new(
                "wf-b",
                vec![TaskRecord::new(
                    "call_a",
                    TaskType::SubWorkflow,
                    json!({"subWorkflowExecutionId": "wf-a"}),
                )],
            ),
        ]);

        let err = resolver
            .resolve("call_a", &json!({"subWorkflowExecutionId": "wf-a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::Cycle(id) if id == "wf-a"));
    }

    #[tokio::test]
    async fn reference_back_to_the_root_execution_is_a_cycle() {
        let resolver = resolver_with(vec![]);
        let err = resolver
            .resolve("call_self", &json!({"subWorkflowExecutionId": "root"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::Cycle(id) if id == "root"));
    }

    #[tokio::test]
    async fn missing_nested_trace_is_a_fetch_error() {
        let resolver = resolver_with(vec![]);
        let err = resolver
            .resolve("call", &json!({"subWorkflowExecutionId": "wf-gone"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::Fetch { execution_id, .. } if execution_id == "wf-gone"));
    }
}
