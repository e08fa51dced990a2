//! tf-core: Shared types for Tracefold
//!
//! This crate has zero internal crate dependencies and defines the
//! canonical types used across all other tf-* crates.

pub mod name;
pub mod outputs;
pub mod trace;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::name::canonical_name;
    pub use crate::outputs::AggregatedOutputs;
    pub use crate::trace::{
        sub_workflow_execution_id, DoWhileState, ExecutionTrace, TaskRecord, TaskType,
        TraceDecodeError, SUB_WORKFLOW_ID_FIELD,
    };
}
