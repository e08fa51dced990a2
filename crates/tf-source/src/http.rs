//! HTTP trace source — reads a Conductor-style execution-status endpoint.

use crate::{SourceError, TraceSource};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use tf_core::trace::ExecutionTrace;
use url::Url;

/// Fetches traces over HTTP from `GET {base}/workflow/{id}?includeTasks=true`.
pub struct HttpTraceSource {
    client: HttpClient,
    base_url: Url,
}

impl HttpTraceSource {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(HttpClient::new(), base_url)
    }

    /// Create a source with an explicit client (shared pools, custom TLS).
    pub fn with_client(client: HttpClient, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn execution_url(&self, execution_id: &str) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(&format!("workflow/{execution_id}"))
            .map_err(|e| SourceError::Transport {
                execution_id: execution_id.to_string(),
                message: format!("invalid execution URL: {e}"),
            })?;
        url.set_query(Some("includeTasks=true"));
        Ok(url)
    }
}

#[async_trait]
impl TraceSource for HttpTraceSource {
    async fn fetch(&self, execution_id: &str) -> Result<ExecutionTrace, SourceError> {
        let url = self.execution_url(execution_id)?;
        tracing::debug!(execution_id, %url, "fetching execution trace");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                execution_id: execution_id.to_string(),
                message: e.to_string(),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::UnknownExecution(execution_id.to_string()));
        }

        let response = response
            .error_for_status()
            .map_err(|e| SourceError::Transport {
                execution_id: execution_id.to_string(),
                message: e.to_string(),
            })?;

        response
            .json::<ExecutionTrace>()
            .await
            .map_err(|e| SourceError::Decode {
                execution_id: execution_id.to_string(),
                message: e.to_string(),
            })
    }
}
