//! tf-source: Trace retrieval boundary — fetch an execution trace by id.

pub mod cache;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use tf_core::trace::ExecutionTrace;
use thiserror::Error;

pub use cache::CachedTraceSource;
pub use http::HttpTraceSource;
pub use memory::InMemoryTraceSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error fetching execution {execution_id}: {message}")]
    Transport {
        execution_id: String,
        message: String,
    },
    #[error("execution not found: {0}")]
    UnknownExecution(String),
    #[error("malformed trace payload for execution {execution_id}: {message}")]
    Decode {
        execution_id: String,
        message: String,
    },
}

/// Something that can produce the recorded trace of a workflow execution.
///
/// Retry and caching policy belong to implementations (see
/// [`CachedTraceSource`]); callers treat a fetch failure as fatal to the
/// operation that needed the trace.
#[async_trait]
pub trait TraceSource: Send + Sync {
    async fn fetch(&self, execution_id: &str) -> Result<ExecutionTrace, SourceError>;
}
