use super::types::PartitionMetrics;
use crate::descriptor::types::ResultPartitionId;
use crate::error::ShuffleError;

use anyhow::Result;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future resolving to one partition's metrics.
pub type MetricsFuture =
    Pin<Box<dyn Future<Output = Result<PartitionMetrics, ShuffleError>> + Send>>;

/// A source of partition metrics the gather can race against its deadline.
///
/// The concrete backend decides where metrics come from (its own reports, a
/// remote producer, an external catalog). Implementations must not block;
/// slow sources are tolerated because the gather enforces the deadline.
pub trait MetricsFetch: Send + Sync + 'static {
    fn fetch(&self, partition: &ResultPartitionId) -> MetricsFuture;
}

/// Pulls partition metrics from a producer's task executor over HTTP.
///
/// Retries transient failures with exponential backoff and jitter; the
/// per-attempt timeout keeps one dead producer from eating the whole
/// query deadline.
#[derive(Clone)]
pub struct HttpMetricsClient {
    http_client: reqwest::Client,
    attempt_timeout: Duration,
    attempts: usize,
}

impl HttpMetricsClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            attempt_timeout: Duration::from_millis(500),
            attempts: 3,
        }
    }

    /// Fetches metrics for one partition from the executor at `addr`.
    pub async fn fetch_from(
        &self,
        addr: SocketAddr,
        partition: &ResultPartitionId,
    ) -> Result<PartitionMetrics, ShuffleError> {
        let url = format!("http://{}/internal/partition/{}/metrics", addr, partition);

        let response = self
            .get_with_retry(url)
            .await
            .map_err(|e| ShuffleError::ProducerUnreachable {
                addr,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ShuffleError::Backend(anyhow::anyhow!(
                "metrics request for {} failed: {}",
                partition,
                response.status()
            )));
        }

        response
            .json::<PartitionMetrics>()
            .await
            .map_err(|e| ShuffleError::Backend(anyhow::anyhow!(e)))
    }

    async fn get_with_retry(&self, url: String) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(self.attempt_timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    // Simple jitter to prevent thundering herd
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

impl Default for HttpMetricsClient {
    fn default() -> Self {
        Self::new()
    }
}
