use super::fetch::MetricsFetch;
use super::types::PartitionWithMetrics;
use crate::descriptor::types::{JobId, ResultPartitionId};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

/// Retrieves metrics for the expected partitions, racing every fetch against
/// a hard deadline.
///
/// Each partition gets its own spawned fetch; results funnel through a
/// channel and are collected until either all fetches finished or the
/// deadline passed. Partitions that error or miss the deadline are omitted,
/// so the call returns a partial result, never a failure.
pub async fn gather_partition_metrics(
    fetcher: Arc<dyn MetricsFetch>,
    job_id: &JobId,
    timeout: Duration,
    expected: HashSet<ResultPartitionId>,
) -> Vec<PartitionWithMetrics> {
    let deadline = Instant::now() + timeout;
    let total = expected.len();
    let (tx, mut rx) = mpsc::channel(total.max(1));

    for partition in expected {
        let fetcher = fetcher.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let result = fetcher.fetch(&partition).await;
            // Receiver may be gone if the deadline already fired
            let _ = tx.send((partition, result)).await;
        });
    }
    // Drop our sender so the channel closes once every fetch reported in
    drop(tx);

    let mut collected = Vec::with_capacity(total);

    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Some((partition_id, Ok(metrics)))) => {
                collected.push(PartitionWithMetrics {
                    partition_id,
                    metrics,
                });
            }
            Ok(Some((partition_id, Err(e)))) => {
                tracing::debug!(
                    "Omitting partition {} from metrics for job {}: {}",
                    partition_id,
                    job_id,
                    e
                );
            }
            // All fetches accounted for
            Ok(None) => break,
            Err(_) => {
                tracing::debug!(
                    "Metrics deadline hit for job {}: returning {}/{} partitions",
                    job_id,
                    collected.len(),
                    total
                );
                break;
            }
        }
    }

    collected
}
