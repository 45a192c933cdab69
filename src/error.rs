//! Coordinator Error Taxonomy
//!
//! Every failure a caller must be able to distinguish gets its own variant.
//! Asynchronous operations never panic or block on error; failures travel
//! through the returned future.

use crate::descriptor::types::{JobId, ResultPartitionId};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShuffleError {
    /// Registration or query against a job this coordinator does not know.
    #[error("job {0} is not registered with the shuffle coordinator")]
    UnknownJob(JobId),

    /// A second registration for the same (job, partition) pair arrived while
    /// the first was still in flight. The caller must not issue these
    /// concurrently; the coordinator rejects rather than guessing merge
    /// semantics.
    #[error("registration for partition {0} is already in flight")]
    DuplicateRegistration(ResultPartitionId),

    /// The producing task could not be reached at its advertised location.
    #[error("producer at {addr} unreachable: {reason}")]
    ProducerUnreachable { addr: SocketAddr, reason: String },

    /// Failure reported by the external system backing the shuffle service.
    #[error("shuffle backend error: {0}")]
    Backend(#[source] anyhow::Error),

    /// Snapshot restore attempted while the job was not in the
    /// `RestorePending` phase signaled by `notify_partition_recovery_started`.
    #[error("job {0} is not awaiting partition recovery")]
    NotAwaitingRecovery(JobId),

    /// A snapshot payload could not be decoded.
    #[error("snapshot payload could not be decoded: {0}")]
    SnapshotCodec(String),
}
