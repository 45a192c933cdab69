use super::backend::{ShuffleBackend, ShuffleDescriptor};
use crate::descriptor::types::{JobId, PartitionDescriptor, ProducerDescriptor, ResultPartitionId, now_ms};
use crate::error::ShuffleError;

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// State of one partition within its job's table.
///
/// `Pending` is the in-flight marker inserted before the backend call; it is
/// what rejects a concurrent duplicate registration for the same pair. The
/// timestamp lets the maintenance sweep evict markers whose registration
/// never came back.
#[derive(Debug, Clone)]
pub enum PartitionState<D> {
    Pending { since_ms: u64 },
    Registered(D),
}

type JobPartitionTable<D> = RwLock<HashMap<ResultPartitionId, PartitionState<D>>>;

/// Tracks which shuffle descriptor was issued for which (job, partition).
///
/// One table per job: operations on different jobs never contend, and a
/// job's table can be cloned under its lock for a consistent point-in-time
/// snapshot. The reverse index maps a descriptor's partition back to its
/// owning job for release.
pub struct PartitionRegistry<B: ShuffleBackend> {
    backend: Arc<B>,
    partitions: DashMap<JobId, JobPartitionTable<B::Descriptor>>,
    partition_jobs: DashMap<ResultPartitionId, JobId>,
}

impl<B: ShuffleBackend> PartitionRegistry<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            partitions: DashMap::new(),
            partition_jobs: DashMap::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Creates the partition table for a job. Idempotent; an existing table
    /// is kept as is.
    pub fn open_job(&self, job_id: &JobId) {
        self.partitions
            .entry(job_id.clone())
            .or_insert_with(|| RwLock::new(HashMap::new()));
    }

    pub fn has_job(&self, job_id: &JobId) -> bool {
        self.partitions.contains_key(job_id)
    }

    /// Registers a partition and its producer with the shuffle service.
    ///
    /// Resolves exactly once. Failure causes are distinguishable:
    /// - `UnknownJob`: the job has no open partition table (never registered,
    ///   or unregistered before/while this call ran).
    /// - `DuplicateRegistration`: another registration for the same pair is
    ///   still in flight or already succeeded.
    /// - `ProducerUnreachable` / `Backend`: surfaced from the backend.
    ///
    /// If the job is closed while the backend call is in flight, the issued
    /// descriptor is released again so unregistration is never visibly
    /// reordered before a registration that preceded it.
    pub async fn register_partition_with_producer(
        &self,
        job_id: &JobId,
        partition: PartitionDescriptor,
        producer: ProducerDescriptor,
    ) -> Result<B::Descriptor, ShuffleError> {
        let partition_id =
            ResultPartitionId::new(partition.result_id.clone(), producer.attempt_id.clone());

        // Phase 1: place the in-flight marker. No await while locks are held.
        {
            let job_table = self
                .partitions
                .get(job_id)
                .ok_or_else(|| ShuffleError::UnknownJob(job_id.clone()))?;

            let mut table = job_table.write().unwrap();
            if table.contains_key(&partition_id) {
                return Err(ShuffleError::DuplicateRegistration(partition_id));
            }
            table.insert(
                partition_id.clone(),
                PartitionState::Pending { since_ms: now_ms() },
            );
        }

        tracing::debug!(
            "Registering partition {} for job {} (producer at {})",
            partition_id,
            job_id,
            producer.address
        );

        // Phase 2: ask the backend. This is the only suspension point.
        let result = self
            .backend
            .register_producer(job_id, &partition, &producer)
            .await;

        // Phase 3: commit or roll back the marker.
        match result {
            Ok(descriptor) => match self.partitions.get(job_id) {
                Some(job_table) => {
                    job_table.write().unwrap().insert(
                        partition_id.clone(),
                        PartitionState::Registered(descriptor.clone()),
                    );
                    self.partition_jobs
                        .insert(partition_id.clone(), job_id.clone());

                    tracing::info!("Registered partition {} for job {}", partition_id, job_id);
                    Ok(descriptor)
                }
                None => {
                    // Job unregistered mid-flight; give the resources back
                    tracing::info!(
                        "Job {} unregistered during registration of {}; releasing descriptor",
                        job_id,
                        partition_id
                    );
                    self.backend.release_externally(&descriptor);
                    Err(ShuffleError::UnknownJob(job_id.clone()))
                }
            },
            Err(e) => {
                if let Some(job_table) = self.partitions.get(job_id) {
                    job_table.write().unwrap().remove(&partition_id);
                }
                tracing::warn!(
                    "Registration of partition {} for job {} failed: {}",
                    partition_id,
                    job_id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Releases resources held for the partition outside the producer's own
    /// runtime. Fully idempotent: unknown descriptors are forwarded to the
    /// backend (whose release is itself a no-op for them) and nothing fails.
    pub fn release_partition_externally(&self, descriptor: &B::Descriptor) {
        let partition_id = descriptor.result_partition_id();

        if let Some((_, job_id)) = self.partition_jobs.remove(partition_id) {
            if let Some(job_table) = self.partitions.get(&job_id) {
                job_table.write().unwrap().remove(partition_id);
            }
            tracing::info!(
                "Released partition {} of job {} externally",
                partition_id,
                job_id
            );
        } else {
            tracing::debug!(
                "External release for untracked partition {}; forwarding to backend",
                partition_id
            );
        }

        self.backend.release_externally(descriptor);
    }

    /// Drops a job's partition table and releases every registered partition
    /// except cluster-persistent ones, whose resources outlive the job.
    pub fn close_job(&self, job_id: &JobId) {
        let Some((_, job_table)) = self.partitions.remove(job_id) else {
            return;
        };

        let table = job_table.into_inner().unwrap();
        let mut released = 0usize;
        let mut retained = 0usize;

        for (partition_id, state) in table {
            self.partition_jobs.remove(&partition_id);

            if let PartitionState::Registered(descriptor) = state {
                if descriptor.is_cluster_persistent() {
                    retained += 1;
                } else {
                    self.backend.release_externally(&descriptor);
                    released += 1;
                }
            }
        }

        tracing::info!(
            "Closed job {}: released {} partitions, retained {} cluster-persistent",
            job_id,
            released,
            retained
        );
    }

    /// Identifiers of all fully registered partitions of a job.
    pub fn registered_partitions(&self, job_id: &JobId) -> Vec<ResultPartitionId> {
        match self.partitions.get(job_id) {
            Some(job_table) => job_table
                .read()
                .unwrap()
                .iter()
                .filter_map(|(id, state)| match state {
                    PartitionState::Registered(_) => Some(id.clone()),
                    PartitionState::Pending { .. } => None,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn lookup_descriptor(&self, partition_id: &ResultPartitionId) -> Option<B::Descriptor> {
        let job_id = self.partition_jobs.get(partition_id)?.value().clone();
        let job_table = self.partitions.get(&job_id)?;
        let table = job_table.read().unwrap();
        match table.get(partition_id) {
            Some(PartitionState::Registered(descriptor)) => Some(descriptor.clone()),
            _ => None,
        }
    }

    /// Clones a job's registered descriptors under its table lock, giving a
    /// consistent point-in-time view for snapshots.
    pub fn capture_job(&self, job_id: &JobId) -> Option<Vec<B::Descriptor>> {
        let job_table = self.partitions.get(job_id)?;
        let table = job_table.read().unwrap();
        Some(
            table
                .values()
                .filter_map(|state| match state {
                    PartitionState::Registered(descriptor) => Some(descriptor.clone()),
                    PartitionState::Pending { .. } => None,
                })
                .collect(),
        )
    }

    /// Captures every job's registered descriptors.
    pub fn capture_all(&self) -> Vec<(JobId, Vec<B::Descriptor>)> {
        self.partitions
            .iter()
            .map(|entry| {
                let table = entry.value().read().unwrap();
                let descriptors = table
                    .values()
                    .filter_map(|state| match state {
                        PartitionState::Registered(descriptor) => Some(descriptor.clone()),
                        PartitionState::Pending { .. } => None,
                    })
                    .collect();
                (entry.key().clone(), descriptors)
            })
            .collect()
    }

    /// Replaces a job's bookkeeping with the given descriptors. In-flight
    /// markers and previous entries for the job are discarded, not merged.
    pub fn restore_job(&self, job_id: &JobId, descriptors: Vec<B::Descriptor>) {
        // The previous incarnation's reverse-index entries go too; keeping
        // them would over-count partitions and let a stale mapping satisfy a
        // later release lookup.
        self.partition_jobs.retain(|_, owner| *owner != *job_id);

        let mut table = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let partition_id = descriptor.result_partition_id().clone();
            self.partition_jobs
                .insert(partition_id.clone(), job_id.clone());
            table.insert(partition_id, PartitionState::Registered(descriptor));
        }

        let count = table.len();
        self.partitions.insert(job_id.clone(), RwLock::new(table));
        tracing::debug!("Replaced partition table of job {} with {} entries", job_id, count);
    }

    /// Replaces the whole registry's bookkeeping.
    pub fn restore_all(&self, jobs: Vec<(JobId, Vec<B::Descriptor>)>) {
        self.partitions.clear();
        self.partition_jobs.clear();

        for (job_id, descriptors) in jobs {
            self.restore_job(&job_id, descriptors);
        }
    }

    /// Evicts in-flight markers older than `max_age`. A marker that old means
    /// the registering task died without committing or rolling back; evicting
    /// it lets the pair register again. Returns how many were evicted.
    pub fn sweep_stale_pending(&self, max_age: Duration) -> usize {
        let cutoff = now_ms().saturating_sub(max_age.as_millis() as u64);
        let mut evicted = 0usize;

        for entry in self.partitions.iter() {
            let mut table = entry.value().write().unwrap();
            table.retain(|partition_id, state| match state {
                PartitionState::Pending { since_ms } if *since_ms < cutoff => {
                    tracing::warn!(
                        "Evicting stale pending registration of partition {} for job {}",
                        partition_id,
                        entry.key()
                    );
                    evicted += 1;
                    false
                }
                _ => true,
            });
        }

        evicted
    }

    pub fn job_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_count(&self) -> usize {
        self.partition_jobs.len()
    }

    /// Clears all bookkeeping without releasing anything. Used by coordinator
    /// shutdown, where the cluster is going away with us.
    pub fn clear(&self) {
        self.partitions.clear();
        self.partition_jobs.clear();
    }
}
