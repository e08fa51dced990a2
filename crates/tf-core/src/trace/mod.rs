//! Trace types — the recorded tasks and outputs of one workflow execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Field inside a task's output that references a nested execution.
pub const SUB_WORKFLOW_ID_FIELD: &str = "subWorkflowExecutionId";

// ---------------------------------------------------------------------------
// ExecutionTrace — immutable snapshot of one run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    /// Identifier of the execution this trace was recorded for.
    pub execution_id: String,

    /// Task records in the order the engine recorded them.
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,

    /// Engine-reported run status (passed through, not interpreted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Run start, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,

    /// Run end, epoch milliseconds (absent while running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl ExecutionTrace {
    pub fn new(execution_id: impl Into<String>, tasks: Vec<TaskRecord>) -> Self {
        Self {
            execution_id: execution_id.into(),
            tasks,
            status: None,
            start_time: None,
            end_time: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskRecord — one row per executed task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Worker-facing reference name, possibly carrying a `__<token>` suffix.
    pub reference_name: String,

    /// Kind of task as recorded by the engine.
    pub task_type: TaskType,

    /// Arbitrary structured output of the task.
    #[serde(default)]
    pub output_data: Value,

    /// Engine-reported task status (passed through, not interpreted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TaskRecord {
    pub fn new(reference_name: impl Into<String>, task_type: TaskType, output_data: Value) -> Self {
        Self {
            reference_name: reference_name.into(),
            task_type,
            output_data,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Simple,
    DoWhile,
    SubWorkflow,
    /// Any task kind this component does not treat specially.
    #[serde(other)]
    Other,
}

/// Nested execution id carried in a task output, if any.
pub fn sub_workflow_execution_id(output_data: &Value) -> Option<&str> {
    output_data.get(SUB_WORKFLOW_ID_FIELD).and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// DoWhileState — decoded loop metadata
// ---------------------------------------------------------------------------

/// Body outputs of one loop iteration, keyed by body reference name in
/// recorded order.
pub type IterationOutputs = serde_json::Map<String, Value>;

/// Decoded output of a DO_WHILE task.
///
/// The engine records the loop output as an object carrying an `iteration`
/// count plus one key per iteration index (`"1"` through `"n"`), each
/// holding the body outputs of that iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileState {
    pub iteration_count: u64,
    per_iteration: Vec<IterationOutputs>,
}

impl DoWhileState {
    /// Decode a DO_WHILE task's output.
    ///
    /// A missing `iteration` count or a missing index key in `1..=n` is a
    /// structural error, never treated as an empty iteration.
    pub fn decode(output_data: &Value) -> Result<Self, TraceDecodeError> {
        let state = output_data
            .as_object()
            .ok_or(TraceDecodeError::NotAnObject)?;

        let iteration_count = state
            .get("iteration")
            .and_then(Value::as_u64)
            .ok_or(TraceDecodeError::MissingIterationCount)?;

        // The count is engine-supplied input; sizing anything from it before
        // the index keys are checked would let a malformed trace force a
        // huge allocation.
        let mut per_iteration = Vec::new();
        for index in 1..=iteration_count {
            let bodies = state
                .get(&index.to_string())
                .and_then(Value::as_object)
                .ok_or(TraceDecodeError::MissingIteration(index))?;
            per_iteration.push(bodies.clone());
        }

        Ok(Self {
            iteration_count,
            per_iteration,
        })
    }

    /// Iterations in ascending index order (1-based index, body outputs).
    pub fn iterations(&self) -> impl Iterator<Item = (u64, &IterationOutputs)> {
        self.per_iteration
            .iter()
            .enumerate()
            .map(|(i, bodies)| (i as u64 + 1, bodies))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceDecodeError {
    #[error("do-while output is not an object")]
    NotAnObject,
    #[error("do-while output carries no iteration count")]
    MissingIterationCount,
    #[error("do-while output is missing iteration {0}")]
    MissingIteration(u64),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
