//! Shuffle Backend Seam
//!
//! The coordinator never moves partition bytes itself; a `ShuffleBackend`
//! does, and hands back an opaque `ShuffleDescriptor` per registered
//! partition. The traits here are the full contract a transport has to meet.
//! `LocalShuffleBackend` is the in-memory reference implementation used by
//! the standalone binary and the test suite.

use crate::descriptor::types::{
    ExecutionAttemptId, JobId, PartitionDescriptor, PartitionKind, ProducerDescriptor,
    ResultPartitionId,
};
use crate::error::ShuffleError;
use crate::metrics::fetch::{HttpMetricsClient, MetricsFetch, MetricsFuture};
use crate::metrics::types::PartitionMetrics;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future resolving a registration request.
pub type RegistrationFuture<D> = Pin<Box<dyn Future<Output = Result<D, ShuffleError>> + Send>>;

/// Opaque handle identifying a partition within the shuffle service.
///
/// Issued once per successful registration and immutable afterwards. Carries
/// enough information for a consumer to read the partition and for the
/// producer's local runtime to write it.
pub trait ShuffleDescriptor: Clone + Send + Sync + 'static {
    fn result_partition_id(&self) -> &ResultPartitionId;

    /// The execution attempt holding producer-local resources, if any.
    /// `None` means all resources live outside the producer (external
    /// storage), so only `release_externally` frees anything.
    fn stores_local_resources_on(&self) -> Option<&ExecutionAttemptId>;

    /// Cluster-persistent partitions survive `unregister_job` and are only
    /// freed by an explicit external release.
    fn is_cluster_persistent(&self) -> bool;
}

/// The transport-specific service the coordinator delegates to.
///
/// `register_producer` is the only inherently asynchronous operation: a real
/// backend talks to an external resource manager here. Failures surface
/// through the returned future, never as panics.
pub trait ShuffleBackend: Send + Sync + 'static {
    type Descriptor: ShuffleDescriptor;

    fn register_producer(
        &self,
        job_id: &JobId,
        partition: &PartitionDescriptor,
        producer: &ProducerDescriptor,
    ) -> RegistrationFuture<Self::Descriptor>;

    /// Releases resources held outside the producing task's runtime. Must be
    /// idempotent: releasing an unknown or already-released descriptor is a
    /// no-op.
    fn release_externally(&self, descriptor: &Self::Descriptor);
}

/// Descriptor issued by `LocalShuffleBackend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalShuffleDescriptor {
    pub partition_id: ResultPartitionId,
    pub producer_attempt: ExecutionAttemptId,
    pub producer_address: SocketAddr,
    pub data_port: u16,
    pub kind: PartitionKind,
}

impl ShuffleDescriptor for LocalShuffleDescriptor {
    fn result_partition_id(&self) -> &ResultPartitionId {
        &self.partition_id
    }

    fn stores_local_resources_on(&self) -> Option<&ExecutionAttemptId> {
        match self.kind {
            // Pipelined data never leaves the producer
            PartitionKind::Pipelined => Some(&self.producer_attempt),
            PartitionKind::Blocking | PartitionKind::BlockingPersistent => None,
        }
    }

    fn is_cluster_persistent(&self) -> bool {
        self.kind.is_cluster_persistent()
    }
}

/// In-memory reference backend.
///
/// Registers partitions instantly, enforces a capacity bound, accepts metric
/// reports pushed by producers and can optionally pull missing metrics from
/// the producer's executor over HTTP.
pub struct LocalShuffleBackend {
    max_partitions: usize,
    partitions: DashMap<ResultPartitionId, LocalShuffleDescriptor>,
    reported_metrics: DashMap<ResultPartitionId, PartitionMetrics>,
    remote_metrics: Option<HttpMetricsClient>,
}

impl LocalShuffleBackend {
    pub fn new(max_partitions: usize) -> Arc<Self> {
        Arc::new(Self {
            max_partitions,
            partitions: DashMap::new(),
            reported_metrics: DashMap::new(),
            remote_metrics: None,
        })
    }

    /// Enables pulling metrics from producer executors when no pushed report
    /// exists for a partition.
    pub fn with_remote_metrics(max_partitions: usize, client: HttpMetricsClient) -> Arc<Self> {
        Arc::new(Self {
            max_partitions,
            partitions: DashMap::new(),
            reported_metrics: DashMap::new(),
            remote_metrics: Some(client),
        })
    }

    /// Records metrics pushed by a producer. Later reports replace earlier
    /// ones; reports for partitions this backend never issued are ignored.
    pub fn report_metrics(&self, partition_id: &ResultPartitionId, metrics: PartitionMetrics) {
        if !self.partitions.contains_key(partition_id) {
            tracing::debug!("Ignoring metrics report for unknown partition {}", partition_id);
            return;
        }

        self.reported_metrics.insert(partition_id.clone(), metrics);
        tracing::trace!("Recorded metrics report for partition {}", partition_id);
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn holds_partition(&self, partition_id: &ResultPartitionId) -> bool {
        self.partitions.contains_key(partition_id)
    }
}

impl ShuffleBackend for LocalShuffleBackend {
    type Descriptor = LocalShuffleDescriptor;

    fn register_producer(
        &self,
        job_id: &JobId,
        partition: &PartitionDescriptor,
        producer: &ProducerDescriptor,
    ) -> RegistrationFuture<Self::Descriptor> {
        // A producer with no data endpoint can never serve consumers
        if producer.data_port == 0 {
            let err = ShuffleError::ProducerUnreachable {
                addr: producer.address,
                reason: "producer advertises no data port".to_string(),
            };
            return Box::pin(std::future::ready(Err(err)));
        }

        if self.partitions.len() >= self.max_partitions {
            let err = ShuffleError::Backend(anyhow::anyhow!(
                "partition capacity exhausted ({} registered)",
                self.max_partitions
            ));
            return Box::pin(std::future::ready(Err(err)));
        }

        let descriptor = LocalShuffleDescriptor {
            partition_id: ResultPartitionId::new(
                partition.result_id.clone(),
                producer.attempt_id.clone(),
            ),
            producer_attempt: producer.attempt_id.clone(),
            producer_address: producer.address,
            data_port: producer.data_port,
            kind: partition.kind,
        };

        self.partitions
            .insert(descriptor.partition_id.clone(), descriptor.clone());

        tracing::debug!(
            "Backend registered partition {} for job {} at {}:{}",
            descriptor.partition_id,
            job_id,
            producer.address,
            producer.data_port
        );

        Box::pin(std::future::ready(Ok(descriptor)))
    }

    fn release_externally(&self, descriptor: &Self::Descriptor) {
        let removed = self.partitions.remove(&descriptor.partition_id).is_some();
        self.reported_metrics.remove(&descriptor.partition_id);

        if removed {
            tracing::debug!("Backend released partition {}", descriptor.partition_id);
        } else {
            tracing::trace!(
                "External release for already-released partition {} ignored",
                descriptor.partition_id
            );
        }
    }
}

impl MetricsFetch for LocalShuffleBackend {
    fn fetch(&self, partition: &ResultPartitionId) -> MetricsFuture {
        if let Some(metrics) = self.reported_metrics.get(partition) {
            let metrics = metrics.clone();
            return Box::pin(std::future::ready(Ok(metrics)));
        }

        // No pushed report; pull from the producer if configured
        match (&self.remote_metrics, self.partitions.get(partition)) {
            (Some(client), Some(stored)) => {
                let client = client.clone();
                let addr = stored.producer_address;
                let partition = partition.clone();
                Box::pin(async move { client.fetch_from(addr, &partition).await })
            }
            _ => {
                let err = ShuffleError::Backend(anyhow::anyhow!(
                    "no metrics available for partition {}",
                    partition
                ));
                Box::pin(std::future::ready(Err(err)))
            }
        }
    }
}
