//! Caching wrapper — memoize fetched traces for the lifetime of the source.
//!
//! Traces are immutable snapshots once recorded, so a successful fetch can
//! be reused across aggregation calls that share the source.

use crate::{SourceError, TraceSource};
use async_trait::async_trait;
use std::collections::HashMap;
use tf_core::trace::ExecutionTrace;
use tokio::sync::Mutex;

/// Wraps any [`TraceSource`] with an in-memory cache keyed by execution id.
/// Only successful fetches are cached; failures always hit the inner source
/// again.
pub struct CachedTraceSource<S> {
    inner: S,
    cache: Mutex<HashMap<String, ExecutionTrace>>,
}

impl<S: TraceSource> CachedTraceSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S: TraceSource> TraceSource for CachedTraceSource<S> {
    async fn fetch(&self, execution_id: &str) -> Result<ExecutionTrace, SourceError> {
        if let Some(trace) = self.cache.lock().await.get(execution_id) {
            tracing::debug!(execution_id, "trace cache hit");
            return Ok(trace.clone());
        }

        let trace = self.inner.fetch(execution_id).await?;
        self.cache
            .lock()
            .await
            .insert(execution_id.to_string(), trace.clone());
        Ok(trace)
    }
}
