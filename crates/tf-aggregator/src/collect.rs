//! Output collection — drive the loop iterations and merge resolved pairs
//! into the final ordered multi-map.

use crate::extract;
use crate::resolve::SubWorkflowResolver;
use crate::AggregateError;
use futures::future::try_join_all;
use std::sync::Arc;
use tf_core::outputs::AggregatedOutputs;
use tf_core::trace::ExecutionTrace;
use tf_source::TraceSource;

/// Collect the named loop's outputs from `trace` into an ordered multi-map.
///
/// Body items within one iteration are resolved in batches of at most
/// `max_concurrent_fetches`: items in a batch run concurrently, batches run
/// in recorded order, and results are merged in recorded order — iteration
/// ascending, then within-iteration body order, then depth-first
/// sub-expansion order. Fetch completion order never leaks into the result.
pub async fn collect(
    source: Arc<dyn TraceSource>,
    trace: &ExecutionTrace,
    loop_reference_name: &str,
    max_concurrent_fetches: usize,
) -> Result<AggregatedOutputs, AggregateError> {
    let state = extract::extract(trace, loop_reference_name)?;
    let resolver = SubWorkflowResolver::new(source, &trace.execution_id);
    let batch_size = max_concurrent_fetches.max(1);

    let mut outputs = AggregatedOutputs::new();
    for (index, bodies) in state.iterations() {
        tracing::debug!(
            loop_reference_name,
            iteration = index,
            body_items = bodies.len(),
            "collecting iteration"
        );

        let items: Vec<_> = bodies.iter().collect();
        for batch in items.chunks(batch_size) {
            // try_join_all keeps input order and drops the remaining
            // futures on the first error, so failure and cancellation are
            // both immediate.
            let resolutions = try_join_all(
                batch
                    .iter()
                    .map(|&(body_reference_name, body_output)| {
                        resolver.resolve(body_reference_name, body_output)
                    }),
            )
            .await?;

            for pairs in resolutions {
                for (name, output) in pairs {
                    outputs.append(name, output);
                }
            }
        }
    }

    Ok(outputs)
}
