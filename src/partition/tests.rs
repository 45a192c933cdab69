//! Partition Registry Tests
//!
//! Exercises the registration/release protocol against the in-memory
//! backend: distinguishable failures, idempotent release, duplicate
//! rejection, concurrency across distinct partitions and linearization with
//! job closure.

#[cfg(test)]
mod tests {
    use crate::descriptor::types::{
        ExecutionAttemptId, IntermediateResultId, JobId, PartitionDescriptor, PartitionKind,
        ProducerDescriptor,
    };
    use crate::error::ShuffleError;
    use crate::partition::backend::{
        LocalShuffleBackend, LocalShuffleDescriptor, RegistrationFuture, ShuffleBackend,
        ShuffleDescriptor,
    };
    use crate::partition::registry::PartitionRegistry;
    use std::sync::Arc;

    fn partition_desc(kind: PartitionKind) -> PartitionDescriptor {
        PartitionDescriptor {
            result_id: IntermediateResultId::new(),
            num_subpartitions: 4,
            kind,
        }
    }

    fn producer_desc(data_port: u16) -> ProducerDescriptor {
        ProducerDescriptor {
            attempt_id: ExecutionAttemptId::new(),
            address: "127.0.0.1:7000".parse().unwrap(),
            data_port,
        }
    }

    fn registry_with_capacity(capacity: usize) -> (Arc<LocalShuffleBackend>, PartitionRegistry<LocalShuffleBackend>) {
        let backend = LocalShuffleBackend::new(capacity);
        let registry = PartitionRegistry::new(backend.clone());
        (backend, registry)
    }

    // ============================================================
    // TEST 1: Successful registration
    // ============================================================

    #[tokio::test]
    async fn test_register_resolves_descriptor() {
        // ARRANGE
        let (backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        // ACT
        let descriptor = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await
            .expect("registration failed");

        // ASSERT: registry and backend both track the partition
        assert_eq!(registry.registered_partitions(&job_id).len(), 1);
        assert!(backend.holds_partition(descriptor.result_partition_id()));
        assert!(
            registry
                .lookup_descriptor(descriptor.result_partition_id())
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_register_for_unknown_job_fails_distinguishably() {
        let (_backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();

        let result = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await;

        assert!(matches!(result, Err(ShuffleError::UnknownJob(_))));
    }

    // ============================================================
    // TEST 2: Duplicate registration guard
    // ============================================================

    #[tokio::test]
    async fn test_second_registration_for_same_pair_rejected() {
        let (_backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let partition = partition_desc(PartitionKind::Blocking);
        let producer = producer_desc(9000);

        registry
            .register_partition_with_producer(&job_id, partition.clone(), producer.clone())
            .await
            .expect("first registration failed");

        // Same (result, attempt) pair again: rejected, never merged
        let result = registry
            .register_partition_with_producer(&job_id, partition, producer)
            .await;

        assert!(matches!(
            result,
            Err(ShuffleError::DuplicateRegistration(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_registration_clears_inflight_marker() {
        let (_backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let partition = partition_desc(PartitionKind::Blocking);
        let mut producer = producer_desc(0);

        // First attempt: no data port, producer unreachable
        let result = registry
            .register_partition_with_producer(&job_id, partition.clone(), producer.clone())
            .await;
        assert!(matches!(
            result,
            Err(ShuffleError::ProducerUnreachable { .. })
        ));

        // The marker was rolled back, so the same pair can register again
        producer.data_port = 9000;
        registry
            .register_partition_with_producer(&job_id, partition, producer)
            .await
            .expect("retry after rollback failed");
    }

    // ============================================================
    // TEST 3: Idempotent external release
    // ============================================================

    #[tokio::test]
    async fn test_release_twice_is_noop() {
        let (backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let descriptor = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await
            .expect("registration failed");

        // ACT: release twice
        registry.release_partition_externally(&descriptor);
        registry.release_partition_externally(&descriptor);

        // ASSERT: no observable difference from a single release
        assert_eq!(registry.registered_partitions(&job_id).len(), 0);
        assert_eq!(registry.partition_count(), 0);
        assert!(!backend.holds_partition(descriptor.result_partition_id()));
    }

    #[tokio::test]
    async fn test_release_unknown_descriptor_is_noop() {
        let (_backend, registry) = registry_with_capacity(16);

        let descriptor = LocalShuffleDescriptor {
            partition_id: crate::descriptor::types::ResultPartitionId::new(
                IntermediateResultId::new(),
                ExecutionAttemptId::new(),
            ),
            producer_attempt: ExecutionAttemptId::new(),
            producer_address: "127.0.0.1:7000".parse().unwrap(),
            data_port: 9000,
            kind: PartitionKind::Blocking,
        };

        // Never registered; release must not fail
        registry.release_partition_externally(&descriptor);
        assert_eq!(registry.partition_count(), 0);
    }

    // ============================================================
    // TEST 4: Concurrency across distinct partitions
    // ============================================================

    #[tokio::test]
    async fn test_concurrent_distinct_registrations_all_succeed() {
        // ARRANGE: capacity exactly matches the number of registrations
        let n = 32;
        let backend = LocalShuffleBackend::new(n);
        let registry = Arc::new(PartitionRegistry::new(backend));
        let job_id = JobId::new();
        registry.open_job(&job_id);

        // ACT: register N distinct partitions concurrently
        let mut handles = Vec::new();
        for _ in 0..n {
            let registry = registry.clone();
            let job_id = job_id.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register_partition_with_producer(
                        &job_id,
                        partition_desc(PartitionKind::Blocking),
                        producer_desc(9000),
                    )
                    .await
            }));
        }

        // ASSERT: every registration resolved independently with success
        for handle in handles {
            handle.await.unwrap().expect("registration failed");
        }
        assert_eq!(registry.registered_partitions(&job_id).len(), n);
    }

    #[tokio::test]
    async fn test_capacity_exhaustion_is_backend_error() {
        let (_backend, registry) = registry_with_capacity(1);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await
            .expect("first registration failed");

        let result = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await;

        assert!(matches!(result, Err(ShuffleError::Backend(_))));
    }

    // ============================================================
    // TEST 5: Job closure semantics
    // ============================================================

    #[tokio::test]
    async fn test_close_job_releases_all_but_persistent() {
        let (backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let ephemeral = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await
            .unwrap();

        let persistent = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::BlockingPersistent),
                producer_desc(9000),
            )
            .await
            .unwrap();

        // ACT
        registry.close_job(&job_id);

        // ASSERT: ephemeral released in the backend, persistent survives
        assert!(!backend.holds_partition(ephemeral.result_partition_id()));
        assert!(backend.holds_partition(persistent.result_partition_id()));
        assert!(!registry.has_job(&job_id));
    }

    // ============================================================
    // TEST 6: Unregistration during an in-flight registration
    // ============================================================

    /// Backend that parks registrations until the test opens the gate.
    struct GatedBackend {
        inner: Arc<LocalShuffleBackend>,
        gate: Arc<tokio::sync::Notify>,
    }

    impl ShuffleBackend for GatedBackend {
        type Descriptor = LocalShuffleDescriptor;

        fn register_producer(
            &self,
            job_id: &JobId,
            partition: &PartitionDescriptor,
            producer: &ProducerDescriptor,
        ) -> RegistrationFuture<Self::Descriptor> {
            let inner = self.inner.clone();
            let gate = self.gate.clone();
            let job_id = job_id.clone();
            let partition = partition.clone();
            let producer = producer.clone();

            Box::pin(async move {
                gate.notified().await;
                inner.register_producer(&job_id, &partition, &producer).await
            })
        }

        fn release_externally(&self, descriptor: &Self::Descriptor) {
            self.inner.release_externally(descriptor);
        }
    }

    #[tokio::test]
    async fn test_job_closed_midflight_releases_descriptor() {
        // ARRANGE
        let inner = LocalShuffleBackend::new(16);
        let gate = Arc::new(tokio::sync::Notify::new());
        let backend = Arc::new(GatedBackend {
            inner: inner.clone(),
            gate: gate.clone(),
        });
        let registry = Arc::new(PartitionRegistry::new(backend));
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let partition = partition_desc(PartitionKind::Blocking);
        let producer = producer_desc(9000);
        let partition_id = crate::descriptor::types::ResultPartitionId::new(
            partition.result_id.clone(),
            producer.attempt_id.clone(),
        );

        // ACT: start a registration that parks inside the backend
        let registry_clone = registry.clone();
        let job_clone = job_id.clone();
        let handle = tokio::spawn(async move {
            registry_clone
                .register_partition_with_producer(&job_clone, partition, producer)
                .await
        });

        // Let the registration reach the gate, then pull the job out from
        // under it and open the gate.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        registry.close_job(&job_id);
        gate.notify_one();

        // ASSERT: the caller sees UnknownJob and the orphan descriptor was
        // handed back to the backend.
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ShuffleError::UnknownJob(_))));
        assert!(!inner.holds_partition(&partition_id));
    }

    // ============================================================
    // TEST 7: Restore replaces the reverse index too
    // ============================================================

    #[tokio::test]
    async fn test_restore_job_purges_previous_reverse_index() {
        // ARRANGE: job J with P1 registered
        let (_backend, registry) = registry_with_capacity(16);
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let first = registry
            .register_partition_with_producer(
                &job_id,
                partition_desc(PartitionKind::Blocking),
                producer_desc(9000),
            )
            .await
            .expect("registration failed");

        // A replacement descriptor for a different partition, P2
        let replacement = LocalShuffleDescriptor {
            partition_id: crate::descriptor::types::ResultPartitionId::new(
                IntermediateResultId::new(),
                ExecutionAttemptId::new(),
            ),
            producer_attempt: ExecutionAttemptId::new(),
            producer_address: "127.0.0.1:7000".parse().unwrap(),
            data_port: 9100,
            kind: PartitionKind::Blocking,
        };
        let replacement_id = replacement.partition_id.clone();

        // ACT: restore the job to hold only P2
        registry.restore_job(&job_id, vec![replacement]);

        // ASSERT: P1's mapping is gone everywhere, not just from the table
        assert_eq!(registry.partition_count(), 1);
        assert_eq!(registry.registered_partitions(&job_id), vec![replacement_id.clone()]);
        assert!(registry.lookup_descriptor(first.result_partition_id()).is_none());
        assert!(registry.lookup_descriptor(&replacement_id).is_some());
    }

    // ============================================================
    // TEST 8: Stale pending sweep
    // ============================================================

    #[tokio::test]
    async fn test_sweep_evicts_abandoned_pending_markers() {
        // ARRANGE: a registration parked inside the backend forever
        let inner = LocalShuffleBackend::new(16);
        let gate = Arc::new(tokio::sync::Notify::new());
        let backend = Arc::new(GatedBackend {
            inner,
            gate: gate.clone(),
        });
        let registry = Arc::new(PartitionRegistry::new(backend));
        let job_id = JobId::new();
        registry.open_job(&job_id);

        let partition = partition_desc(PartitionKind::Blocking);
        let producer = producer_desc(9000);

        let registry_clone = registry.clone();
        let job_clone = job_id.clone();
        let partition_clone = partition.clone();
        let producer_clone = producer.clone();
        let handle = tokio::spawn(async move {
            registry_clone
                .register_partition_with_producer(&job_clone, partition_clone, producer_clone)
                .await
        });

        // Let the marker age past the threshold
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        // ACT
        let evicted = registry.sweep_stale_pending(std::time::Duration::from_millis(5));

        // ASSERT: the marker is gone and the pair can register afresh
        assert_eq!(evicted, 1);
        handle.abort();
        // Open the gate so the retry passes straight through
        gate.notify_one();
        registry
            .register_partition_with_producer(&job_id, partition, producer)
            .await
            .expect("re-registration after sweep failed");
    }
}
