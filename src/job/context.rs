use crate::descriptor::types::{JobId, ResultPartitionId};

use std::collections::HashSet;
use tokio::sync::mpsc;

/// A batch of partitions the coordinator detected as lost for one job.
#[derive(Debug, Clone)]
pub struct LostPartitions {
    pub job_id: JobId,
    pub partitions: HashSet<ResultPartitionId>,
}

/// Per-job context handed over by the control plane at registration.
///
/// The only capability it exposes is a one-directional notification channel:
/// the coordinator sends, the control plane receives and reschedules
/// producers. Modeled as a channel rather than a callback object so the
/// coordinator's lifetime never couples to the control plane's object graph.
#[derive(Debug, Clone)]
pub struct JobShuffleContext {
    pub job_id: JobId,
    lost_tx: mpsc::UnboundedSender<LostPartitions>,
}

impl JobShuffleContext {
    pub fn new(job_id: JobId, lost_tx: mpsc::UnboundedSender<LostPartitions>) -> Self {
        Self { job_id, lost_tx }
    }

    /// Creates a context together with the receiving end of its
    /// lost-partition channel. The receiver belongs to the control plane.
    pub fn channel(job_id: JobId) -> (Self, mpsc::UnboundedReceiver<LostPartitions>) {
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();
        (Self { job_id, lost_tx }, lost_rx)
    }

    /// Reports a set of lost partitions to the control plane.
    ///
    /// Best-effort: if the control plane already dropped its receiver the
    /// notification is discarded, which is fine because the job is on its
    /// way out anyway.
    pub fn notify_partitions_lost(&self, partitions: HashSet<ResultPartitionId>) {
        if partitions.is_empty() {
            return;
        }

        let notification = LostPartitions {
            job_id: self.job_id.clone(),
            partitions,
        };

        if self.lost_tx.send(notification).is_err() {
            tracing::debug!(
                "Dropping lost-partition notification for job {}: receiver closed",
                self.job_id
            );
        }
    }
}
