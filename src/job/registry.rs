use super::context::JobShuffleContext;
use crate::descriptor::types::{JobId, now_ms};

use dashmap::DashMap;
use std::sync::Arc;

/// Per-job recovery state machine.
///
/// Snapshot capture and restore run on independent tracks:
/// `Running -> SnapshotRequested -> SnapshotComplete` and
/// `Running -> RestorePending -> Restored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    Running,
    SnapshotRequested,
    SnapshotComplete,
    RestorePending,
    Restored,
}

/// Bookkeeping kept per registered job.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub context: JobShuffleContext,
    pub phase: RecoveryPhase,
    pub registered_at: u64,
}

/// Registry of jobs currently active with the coordinator.
///
/// Shares nothing with the partition registry except the `JobId` key, so
/// traffic for unrelated jobs never serializes on a common lock.
pub struct JobRegistry {
    jobs: DashMap<JobId, JobEntry>,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            jobs: DashMap::new(),
        })
    }

    /// Associates a job with its shuffle context.
    ///
    /// Safe to call multiple times for the same job; a later call replaces
    /// the context (e.g., a fresh callback channel after control-plane
    /// failover) but keeps the current recovery phase.
    pub fn register_job(&self, context: JobShuffleContext) {
        let job_id = context.job_id.clone();

        match self.jobs.entry(job_id.clone()) {
            dashmap::Entry::Occupied(mut entry) => {
                entry.get_mut().context = context;
                tracing::info!("Replaced shuffle context for job {}", job_id);
            }
            dashmap::Entry::Vacant(entry) => {
                entry.insert(JobEntry {
                    context,
                    phase: RecoveryPhase::Running,
                    registered_at: now_ms(),
                });
                tracing::info!("Registered job {}", job_id);
            }
        }
    }

    /// Marks the job terminated and drops its bookkeeping.
    ///
    /// Idempotent: unregistering an unknown job is a silent no-op. Returns
    /// the removed entry so the caller can release job-scoped resources.
    pub fn unregister_job(&self, job_id: &JobId) -> Option<JobEntry> {
        match self.jobs.remove(job_id) {
            Some((_, entry)) => {
                tracing::info!("Unregistered job {}", job_id);
                Some(entry)
            }
            None => {
                tracing::debug!("Unregister for unknown job {} ignored", job_id);
                None
            }
        }
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn get_context(&self, job_id: &JobId) -> Option<JobShuffleContext> {
        self.jobs.get(job_id).map(|entry| entry.context.clone())
    }

    pub fn phase(&self, job_id: &JobId) -> Option<RecoveryPhase> {
        self.jobs.get(job_id).map(|entry| entry.phase)
    }

    /// Signals that the control plane is about to attempt partition recovery
    /// for this job. Eager cleanup is suspended until restore completes or
    /// the job is unregistered.
    pub fn notify_partition_recovery_started(&self, job_id: &JobId) {
        match self.jobs.get_mut(job_id) {
            Some(mut entry) => {
                entry.phase = RecoveryPhase::RestorePending;
                tracing::info!("Job {} entered RestorePending", job_id);
            }
            None => {
                tracing::warn!(
                    "Recovery-start notification for unknown job {} ignored",
                    job_id
                );
            }
        }
    }

    /// True while the job awaits a restore; cleanup and lost-partition
    /// notifications are suppressed in this window.
    pub fn is_restore_pending(&self, job_id: &JobId) -> bool {
        self.phase(job_id) == Some(RecoveryPhase::RestorePending)
    }

    /// Moves the job from `RestorePending` to `Restored`. Returns false if
    /// the job was not awaiting recovery.
    pub fn complete_restore(&self, job_id: &JobId) -> bool {
        match self.jobs.get_mut(job_id) {
            Some(mut entry) if entry.phase == RecoveryPhase::RestorePending => {
                entry.phase = RecoveryPhase::Restored;
                tracing::info!("Job {} restored", job_id);
                true
            }
            _ => false,
        }
    }

    /// Marks snapshot capture in progress / finished for one job. Unknown
    /// jobs are ignored: a whole-coordinator snapshot may cover jobs that
    /// unregistered mid-capture.
    pub fn set_snapshot_phase(&self, job_id: &JobId, complete: bool) {
        if let Some(mut entry) = self.jobs.get_mut(job_id) {
            entry.phase = if complete {
                RecoveryPhase::SnapshotComplete
            } else {
                RecoveryPhase::SnapshotRequested
            };
        }
    }

    /// Returns the job to `Running`, undoing a snapshot phase left behind by
    /// a capture that failed partway.
    pub fn resume_running(&self, job_id: &JobId) {
        if let Some(mut entry) = self.jobs.get_mut(job_id) {
            entry.phase = RecoveryPhase::Running;
        }
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Clears all job bookkeeping. Used by coordinator shutdown.
    pub fn clear(&self) {
        self.jobs.clear();
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }
}
