//! Tracefold — aggregate a do-while loop's outputs from a trace endpoint.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tf_aggregator::{AggregateError, Aggregator, DEFAULT_MAX_CONCURRENT_FETCHES};
use tf_projection::{JmespathProjector, Projector};
use tf_source::{CachedTraceSource, HttpTraceSource, TraceSource};
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "tracefold", version, about = "Flatten do-while loop outputs from a workflow execution trace")]
struct Args {
    /// Base URL of the execution-status endpoint, e.g. http://conductor.local/api/
    #[arg(long)]
    base_url: Url,

    /// Execution id of the root workflow run.
    execution_id: String,

    /// Reference name of the do-while task to collect.
    loop_reference_name: String,

    /// Optional JMESPath expression applied to the aggregated outputs.
    #[arg(long)]
    query: Option<String>,

    /// Maximum number of nested trace fetches in flight per iteration.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_FETCHES)]
    max_concurrent: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let projector = args
        .query
        .as_deref()
        .map(JmespathProjector::new)
        .transpose()
        .context("invalid --query expression")?;

    let source: Arc<dyn TraceSource> =
        Arc::new(CachedTraceSource::new(HttpTraceSource::new(args.base_url)));
    let aggregator = Aggregator::new(source).with_max_concurrent_fetches(args.max_concurrent);

    let result = aggregator
        .aggregate_loop_outputs(
            &args.execution_id,
            &args.loop_reference_name,
            projector.as_ref().map(|p| p as &dyn Projector),
        )
        .await;

    let value = match result {
        Ok(aggregation) => match aggregation.projected {
            Some(projected) => projected,
            None => aggregation.outputs.to_value(),
        },
        // Degrade to the unprojected map when only the projection failed.
        Err(AggregateError::Projection { outputs, source }) => {
            tracing::warn!("projection failed, printing unprojected outputs: {source}");
            outputs.to_value()
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
