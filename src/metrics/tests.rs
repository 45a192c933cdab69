//! Metrics & Sizing Tests
//!
//! Verifies the deadline behavior of the metrics gather (partial results,
//! never a failure) and the determinism of the sizing computation.

#[cfg(test)]
mod tests {
    use crate::descriptor::types::{
        ExecutionAttemptId, IntermediateResultId, JobId, MemorySize, ResultPartitionId,
        TaskInputsOutputsDescriptor,
    };
    use crate::error::ShuffleError;
    use crate::metrics::fetch::{MetricsFetch, MetricsFuture};
    use crate::metrics::query::gather_partition_metrics;
    use crate::metrics::sizing::{SizingPolicy, compute_shuffle_memory_size_for_task};
    use crate::metrics::types::PartitionMetrics;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn some_partition() -> ResultPartitionId {
        ResultPartitionId::new(IntermediateResultId::new(), ExecutionAttemptId::new())
    }

    /// Fetcher that always fails immediately.
    struct UnreachableFetcher;

    impl MetricsFetch for UnreachableFetcher {
        fn fetch(&self, partition: &ResultPartitionId) -> MetricsFuture {
            let err = ShuffleError::Backend(anyhow::anyhow!(
                "no source for partition {}",
                partition
            ));
            Box::pin(std::future::ready(Err(err)))
        }
    }

    /// Fetcher that answers for one known partition and hangs for the rest.
    struct OneFastRestSlow {
        fast: ResultPartitionId,
    }

    impl MetricsFetch for OneFastRestSlow {
        fn fetch(&self, partition: &ResultPartitionId) -> MetricsFuture {
            if partition == &self.fast {
                return Box::pin(std::future::ready(Ok(PartitionMetrics::new(vec![
                    10, 20, 30,
                ]))));
            }

            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(PartitionMetrics::new(vec![]))
            })
        }
    }

    // ============================================================
    // TEST 1: Gather never fails, resolves within the deadline
    // ============================================================

    #[tokio::test]
    async fn test_unreachable_sources_yield_empty_within_timeout() {
        // ARRANGE: five partitions, none reachable
        let fetcher = Arc::new(UnreachableFetcher);
        let expected: HashSet<_> = (0..5).map(|_| some_partition()).collect();
        let timeout = Duration::from_secs(5);

        // ACT
        let started = Instant::now();
        let collected =
            gather_partition_metrics(fetcher, &JobId::new(), timeout, expected).await;

        // ASSERT: empty result, and resolved long before the deadline since
        // every fetch failed immediately
        assert!(collected.is_empty());
        assert!(started.elapsed() < timeout);
    }

    #[tokio::test]
    async fn test_empty_expected_set_resolves_immediately() {
        let fetcher = Arc::new(UnreachableFetcher);

        let collected = gather_partition_metrics(
            fetcher,
            &JobId::new(),
            Duration::from_secs(5),
            HashSet::new(),
        )
        .await;

        assert!(collected.is_empty());
    }

    // ============================================================
    // TEST 2: Partial results when some sources are slow
    // ============================================================

    #[tokio::test]
    async fn test_slow_partitions_are_omitted() {
        // ARRANGE: one fast partition among hanging ones
        let fast = some_partition();
        let fetcher = Arc::new(OneFastRestSlow { fast: fast.clone() });

        let mut expected: HashSet<_> = (0..3).map(|_| some_partition()).collect();
        expected.insert(fast.clone());

        // ACT: tight deadline
        let started = Instant::now();
        let collected = gather_partition_metrics(
            fetcher,
            &JobId::new(),
            Duration::from_millis(200),
            expected,
        )
        .await;

        // ASSERT: only the fast partition made it, within the deadline
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].partition_id, fast);
        assert_eq!(collected[0].metrics.total_bytes(), 60);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    // ============================================================
    // TEST 3: Sizing computation
    // ============================================================

    #[test]
    fn test_default_policy_reports_zero() {
        let desc = TaskInputsOutputsDescriptor {
            input_channels: vec![8, 16],
            output_subpartitions: vec![32],
        };

        let size = compute_shuffle_memory_size_for_task(SizingPolicy::NONE, &desc);
        assert_eq!(size, MemorySize::ZERO);
    }

    #[test]
    fn test_sizing_is_linear_and_deterministic() {
        let policy = SizingPolicy {
            bytes_per_input_channel: 1024,
            bytes_per_output_subpartition: 2048,
        };
        let desc = TaskInputsOutputsDescriptor {
            input_channels: vec![2, 3],
            output_subpartitions: vec![4],
        };

        // (2 + 3) * 1024 + 4 * 2048
        let expected = MemorySize(5 * 1024 + 4 * 2048);

        assert_eq!(
            compute_shuffle_memory_size_for_task(policy, &desc),
            expected
        );
        // Identical input, identical answer
        assert_eq!(
            compute_shuffle_memory_size_for_task(policy, &desc),
            expected
        );
    }
}
