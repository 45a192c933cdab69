use crate::descriptor::types::{
    JobId, MemorySize, PartitionDescriptor, ProducerDescriptor, ResultPartitionId,
    TaskInputsOutputsDescriptor,
};
use crate::error::ShuffleError;
use crate::job::context::JobShuffleContext;
use crate::job::registry::JobRegistry;
use crate::metrics::fetch::MetricsFetch;
use crate::metrics::query::gather_partition_metrics;
use crate::metrics::sizing::{SizingPolicy, compute_shuffle_memory_size_for_task};
use crate::metrics::types::PartitionWithMetrics;
use crate::partition::backend::ShuffleBackend;
use crate::partition::registry::PartitionRegistry;
use crate::recovery::snapshot::{ShuffleMasterSnapshot, SnapshotScope, combine_job_descriptors};

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Age after which an in-flight registration marker is considered abandoned.
const STALE_PENDING_AFTER: Duration = Duration::from_secs(300);

/// Static configuration of one coordinator instance.
///
/// Fixed at construction; in particular the snapshot capability and the
/// sizing policy never change while the coordinator runs, which keeps
/// sizing deterministic and spares callers per-call capability probing.
#[derive(Debug, Clone, Copy)]
pub struct ShuffleMasterConfig {
    pub sizing: SizingPolicy,
    pub snapshots_enabled: bool,
    pub maintenance_interval: Duration,
}

impl Default for ShuffleMasterConfig {
    fn default() -> Self {
        Self {
            sizing: SizingPolicy::NONE,
            snapshots_enabled: false,
            maintenance_interval: Duration::from_secs(30),
        }
    }
}

/// The coordination service between a job's control plane and the shuffle
/// subsystem exchanging partition data between its tasks.
pub struct ShuffleMaster<B: ShuffleBackend> {
    config: ShuffleMasterConfig,
    jobs: Arc<JobRegistry>,
    partitions: PartitionRegistry<B>,
    metrics: Option<Arc<dyn MetricsFetch>>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl<B: ShuffleBackend> ShuffleMaster<B> {
    pub fn new(config: ShuffleMasterConfig, backend: Arc<B>) -> Arc<Self> {
        Arc::new(Self {
            config,
            jobs: JobRegistry::new(),
            partitions: PartitionRegistry::new(backend),
            metrics: None,
            maintenance: Mutex::new(None),
        })
    }

    /// Builds a coordinator with a metrics capability. Resolved here, once;
    /// a coordinator built without one answers every metrics query with an
    /// empty collection.
    pub fn with_metrics(
        config: ShuffleMasterConfig,
        backend: Arc<B>,
        metrics: Arc<dyn MetricsFetch>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            jobs: JobRegistry::new(),
            partitions: PartitionRegistry::new(backend),
            metrics: Some(metrics),
            maintenance: Mutex::new(None),
        })
    }

    pub fn backend(&self) -> &Arc<B> {
        self.partitions.backend()
    }

    // --- Lifecycle ---

    /// Starts the coordinator as a service: spawns the periodic maintenance
    /// loop reporting bookkeeping stats. Idempotent; a second call is a
    /// no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut guard = self
            .maintenance
            .lock()
            .map_err(|_| anyhow::anyhow!("maintenance handle lock poisoned"))?;

        if guard.is_some() {
            return Ok(());
        }

        let master = self.clone();
        let interval = self.config.maintenance_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;

                let evicted = master.partitions.sweep_stale_pending(STALE_PENDING_AFTER);
                if evicted > 0 {
                    tracing::warn!("Maintenance evicted {} stale pending registrations", evicted);
                }

                tracing::info!(
                    "Shuffle master stats: {} jobs, {} partitions tracked",
                    master.jobs.job_count(),
                    master.partitions.partition_count()
                );
            }
        });

        *guard = Some(handle);
        tracing::info!("Shuffle master started");
        Ok(())
    }

    /// Stops background work and drops all bookkeeping. Only called when the
    /// cluster shuts down.
    pub fn close(&self) {
        if let Ok(mut guard) = self.maintenance.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }

        self.jobs.clear();
        self.partitions.clear();
        tracing::info!("Shuffle master closed");
    }

    // --- Job lifecycle ---

    /// Registers a job and its shuffle context. Calling again for the same
    /// job replaces the context.
    pub fn register_job(&self, context: JobShuffleContext) {
        let job_id = context.job_id.clone();
        self.jobs.register_job(context);
        self.partitions.open_job(&job_id);
    }

    /// Unregisters a job: all its resources except cluster-persistent
    /// partitions become eligible for release. Idempotent; unknown jobs are
    /// a silent no-op.
    pub fn unregister_job(&self, job_id: &JobId) {
        self.jobs.unregister_job(job_id);
        // The partition table may exist without a job entry (restored state);
        // close it either way.
        self.partitions.close_job(job_id);
    }

    /// Signals that the control plane is about to recover this job's
    /// partitions; eager cleanup is suspended until restore completes.
    pub fn notify_partition_recovery_started(&self, job_id: &JobId) {
        self.jobs.notify_partition_recovery_started(job_id);
    }

    // --- Partition lifecycle ---

    /// Asynchronously registers a partition and its producer, resolving
    /// exactly once with the issued shuffle descriptor or a distinguishable
    /// failure.
    pub async fn register_partition_with_producer(
        &self,
        job_id: &JobId,
        partition: PartitionDescriptor,
        producer: ProducerDescriptor,
    ) -> Result<B::Descriptor, ShuffleError> {
        if !self.jobs.contains(job_id) {
            return Err(ShuffleError::UnknownJob(job_id.clone()));
        }

        self.partitions
            .register_partition_with_producer(job_id, partition, producer)
            .await
    }

    /// Releases resources the partition occupies outside the producer's own
    /// runtime. Fully idempotent and order-independent of local release.
    pub fn release_partition_externally(&self, descriptor: &B::Descriptor) {
        self.partitions.release_partition_externally(descriptor);
    }

    /// Reports partitions the coordinator detected as unavailable back to
    /// the control plane, so producers can be rescheduled before consumers
    /// fail. Suppressed while the job awaits recovery.
    pub fn notify_partitions_lost(&self, job_id: &JobId, partitions: HashSet<ResultPartitionId>) {
        if self.jobs.is_restore_pending(job_id) {
            tracing::debug!(
                "Holding lost-partition notification for job {} until recovery settles",
                job_id
            );
            return;
        }

        match self.jobs.get_context(job_id) {
            Some(context) => context.notify_partitions_lost(partitions),
            None => tracing::debug!(
                "Lost-partition notification for unknown job {} dropped",
                job_id
            ),
        }
    }

    // --- Sizing & metrics ---

    /// Shuffle memory a task needs given its fan-in/fan-out shape. Pure and
    /// deterministic under this coordinator's configuration; zero under the
    /// default policy.
    pub fn compute_shuffle_memory_size_for_task(
        &self,
        desc: &TaskInputsOutputsDescriptor,
    ) -> MemorySize {
        compute_shuffle_memory_size_for_task(self.config.sizing, desc)
    }

    /// Retrieves whatever subset of the expected partitions' metrics is
    /// reachable within `timeout`. Never fails; missing partitions are
    /// omitted. Without a metrics capability this resolves immediately with
    /// an empty collection.
    pub async fn get_partition_with_metrics(
        &self,
        job_id: &JobId,
        timeout: Duration,
        expected: HashSet<ResultPartitionId>,
    ) -> Vec<PartitionWithMetrics> {
        let Some(fetcher) = self.metrics.clone() else {
            return Vec::new();
        };

        gather_partition_metrics(fetcher, job_id, timeout, expected).await
    }

    /// Identifiers of all partitions currently registered for a job.
    pub fn registered_partitions(&self, job_id: &JobId) -> Vec<ResultPartitionId> {
        self.partitions.registered_partitions(job_id)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.job_count()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.partition_count()
    }

    /// Whether this coordinator supports snapshot/restore for batch job
    /// recovery. Fixed at construction.
    pub fn supports_batch_snapshot(&self) -> bool {
        self.config.snapshots_enabled
    }
}

impl<B: ShuffleBackend> ShuffleMaster<B>
where
    B::Descriptor: Serialize + DeserializeOwned,
{
    /// Captures the whole coordinator's bookkeeping and completes `reply`
    /// with the snapshot. Without snapshot support the sender is dropped
    /// unresolved, which is the documented no-op.
    pub fn snapshot_state(&self, reply: oneshot::Sender<ShuffleMasterSnapshot>) {
        if !self.config.snapshots_enabled {
            tracing::debug!("Snapshot requested but snapshots are disabled");
            return;
        }

        let captured = self.partitions.capture_all();
        match ShuffleMasterSnapshot::encode(SnapshotScope::Whole, captured) {
            Ok(snapshot) => {
                let _ = reply.send(snapshot);
                tracing::info!("Captured whole-coordinator snapshot");
            }
            Err(e) => {
                tracing::error!("Failed to encode coordinator snapshot: {}", e);
            }
        }
    }

    /// Captures one job's bookkeeping. The job's table is cloned under its
    /// lock, so every concurrent registration is either fully in or fully
    /// out of the snapshot.
    pub fn snapshot_job_state(
        &self,
        reply: oneshot::Sender<ShuffleMasterSnapshot>,
        job_id: &JobId,
    ) {
        if !self.config.snapshots_enabled {
            tracing::debug!("Job snapshot requested but snapshots are disabled");
            return;
        }

        self.jobs.set_snapshot_phase(job_id, false);

        let Some(descriptors) = self.partitions.capture_job(job_id) else {
            tracing::debug!("Snapshot requested for unknown job {}", job_id);
            self.jobs.resume_running(job_id);
            return;
        };

        match ShuffleMasterSnapshot::encode(
            SnapshotScope::Job(job_id.clone()),
            vec![(job_id.clone(), descriptors)],
        ) {
            Ok(snapshot) => {
                self.jobs.set_snapshot_phase(job_id, true);
                let _ = reply.send(snapshot);
                tracing::info!("Captured snapshot for job {}", job_id);
            }
            Err(e) => {
                tracing::error!("Failed to encode snapshot for job {}: {}", job_id, e);
                self.jobs.resume_running(job_id);
            }
        }
    }

    /// Replaces the whole coordinator's bookkeeping with the snapshot
    /// contents. A no-op when snapshots are disabled.
    pub fn restore_state(&self, snapshot: &ShuffleMasterSnapshot) -> Result<(), ShuffleError> {
        if !self.config.snapshots_enabled {
            tracing::debug!("Restore requested but snapshots are disabled");
            return Ok(());
        }

        let jobs = snapshot.decode::<B::Descriptor>()?;
        let job_count = jobs.len();
        self.partitions.restore_all(jobs);

        tracing::info!("Restored coordinator state for {} jobs", job_count);
        Ok(())
    }

    /// Replaces one job's bookkeeping from the given snapshots, which may
    /// originate from multiple prior coordinator incarnations. Only valid
    /// while the job is awaiting recovery.
    pub fn restore_job_state(
        &self,
        snapshots: &[ShuffleMasterSnapshot],
        job_id: &JobId,
    ) -> Result<(), ShuffleError> {
        if !self.config.snapshots_enabled {
            tracing::debug!("Job restore requested but snapshots are disabled");
            return Ok(());
        }

        if !self.jobs.is_restore_pending(job_id) {
            return Err(ShuffleError::NotAwaitingRecovery(job_id.clone()));
        }

        let mut batches = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            for (snapshot_job, descriptors) in snapshot.decode::<B::Descriptor>()? {
                if &snapshot_job == job_id {
                    batches.push(descriptors);
                }
            }
        }

        let combined = combine_job_descriptors(batches);
        let count = combined.len();
        self.partitions.restore_job(job_id, combined);
        self.jobs.complete_restore(job_id);

        tracing::info!("Restored {} partitions for job {}", count, job_id);
        Ok(())
    }
}
