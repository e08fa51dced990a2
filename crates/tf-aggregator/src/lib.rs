//! tf-aggregator: flatten the outputs a do-while loop produced across all
//! iterations and nested sub-workflow expansions into one ordered multi-map.

pub mod collect;
pub mod extract;
pub mod resolve;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tf_core::outputs::AggregatedOutputs;
use tf_core::trace::TraceDecodeError;
use tf_projection::{JmespathProjector, ProjectionError, Projector};
use tf_source::{SourceError, TraceSource};
use thiserror::Error;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

#[derive(Debug, Error)]
pub enum AggregateError {
    /// The named do-while task does not exist in the root trace.
    #[error("do-while task not found in root trace: {0}")]
    NotFound(String),
    /// The do-while task's recorded output is structurally malformed.
    #[error("malformed do-while output for {reference_name}: {source}")]
    Validation {
        reference_name: String,
        #[source]
        source: TraceDecodeError,
    },
    /// A trace could not be retrieved; aborts the whole call. Retrying is
    /// the caller's decision.
    #[error("failed to fetch execution {execution_id}: {source}")]
    Fetch {
        execution_id: String,
        #[source]
        source: SourceError,
    },
    /// A nested execution reference leads back to an execution already
    /// being resolved in this call.
    #[error("nested execution cycle detected at {0}")]
    Cycle(String),
    /// The projection failed; the computed outputs are carried so callers
    /// can fall back to the unprojected structure.
    #[error("projection failed: {source}")]
    Projection {
        outputs: AggregatedOutputs,
        #[source]
        source: ProjectionError,
    },
}

/// Result of one aggregation call.
#[derive(Debug, Clone, Serialize)]
pub struct LoopAggregation {
    /// The flattened canonical-name-keyed multi-map.
    pub outputs: AggregatedOutputs,
    /// The projection result, when a projector was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected: Option<Value>,
}

/// Aggregates loop outputs from traces served by a [`TraceSource`].
pub struct Aggregator {
    source: Arc<dyn TraceSource>,
    max_concurrent_fetches: usize,
}

impl Aggregator {
    pub fn new(source: Arc<dyn TraceSource>) -> Self {
        Self {
            source,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Limit on nested trace fetches in flight within one iteration.
    /// Clamped to at least 1.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    /// Sole entry point: fetch the root trace, collect the named loop's
    /// outputs, then optionally project them.
    ///
    /// All-or-nothing: every error except projection failure aborts with no
    /// partial result, and cancelling the returned future cancels all
    /// in-flight fetches.
    pub async fn aggregate_loop_outputs(
        &self,
        root_execution_id: &str,
        loop_reference_name: &str,
        projector: Option<&dyn Projector>,
    ) -> Result<LoopAggregation, AggregateError> {
        let trace = self.source.fetch(root_execution_id).await.map_err(|source| {
            AggregateError::Fetch {
                execution_id: root_execution_id.to_string(),
                source,
            }
        })?;

        let outputs = collect::collect(
            Arc::clone(&self.source),
            &trace,
            loop_reference_name,
            self.max_concurrent_fetches,
        )
        .await?;
        tracing::debug!(
            root_execution_id,
            loop_reference_name,
            names = outputs.len(),
            total = outputs.total_outputs(),
            "aggregation complete"
        );

        let projected = match projector {
            Some(projector) => match projector.project(&outputs.to_value()) {
                Ok(value) => Some(value),
                Err(source) => return Err(AggregateError::Projection { outputs, source }),
            },
            None => None,
        };

        Ok(LoopAggregation { outputs, projected })
    }
}

/// Convenience wrapper taking a JMESPath query string.
///
/// The expression is compiled only after collection succeeds, so a bad
/// query still surfaces the computed outputs through
/// [`AggregateError::Projection`].
pub async fn aggregate_loop_outputs(
    source: Arc<dyn TraceSource>,
    root_execution_id: &str,
    loop_reference_name: &str,
    query: Option<&str>,
) -> Result<LoopAggregation, AggregateError> {
    let aggregator = Aggregator::new(source);
    let unprojected = aggregator
        .aggregate_loop_outputs(root_execution_id, loop_reference_name, None)
        .await?;

    let Some(query) = query else {
        return Ok(unprojected);
    };

    let projector = match JmespathProjector::new(query) {
        Ok(projector) => projector,
        Err(source) => {
            return Err(AggregateError::Projection {
                outputs: unprojected.outputs,
                source,
            })
        }
    };
    match projector.project(&unprojected.outputs.to_value()) {
        Ok(value) => Ok(LoopAggregation {
            outputs: unprojected.outputs,
            projected: Some(value),
        }),
        Err(source) => Err(AggregateError::Projection {
            outputs: unprojected.outputs,
            source,
        }),
    }
}
