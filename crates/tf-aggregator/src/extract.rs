//! Loop iteration extraction — locate the target do-while task in a trace
//! and decode its recorded per-iteration state.

use crate::AggregateError;
use tf_core::trace::{DoWhileState, ExecutionTrace, TaskType};

/// Find the DO_WHILE task with the given reference name and decode its
/// output into a [`DoWhileState`]. Read-only.
pub fn extract(
    trace: &ExecutionTrace,
    loop_reference_name: &str,
) -> Result<DoWhileState, AggregateError> {
    let task = trace
        .tasks
        .iter()
        .find(|task| {
            task.task_type == TaskType::DoWhile && task.reference_name == loop_reference_name
        })
        .ok_or_else(|| AggregateError::NotFound(loop_reference_name.to_string()))?;

    DoWhileState::decode(&task.output_data).map_err(|source| AggregateError::Validation {
        reference_name: loop_reference_name.to_string(),
        source,
    })
}
