use crate::descriptor::types::{JobId, now_ms};
use crate::error::ShuffleError;
use crate::partition::backend::ShuffleDescriptor;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What part of the coordinator's bookkeeping a snapshot covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SnapshotScope {
    Whole,
    Job(JobId),
}

/// Serialized table of issued descriptors, keyed by job.
#[derive(Serialize, Deserialize)]
struct SnapshotPayload<D> {
    jobs: Vec<(JobId, Vec<D>)>,
}

/// Point-in-time capture of the coordinator's partition bookkeeping.
///
/// Opaque to callers: the control plane persists and hands back snapshots
/// without looking inside. The payload encoding is internal and only a
/// coordinator using the same descriptor type can decode it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuffleMasterSnapshot {
    pub scope: SnapshotScope,
    pub taken_at_ms: u64,
    payload: Vec<u8>,
}

impl ShuffleMasterSnapshot {
    /// Encodes a captured descriptor table into an opaque snapshot.
    pub fn encode<D: Serialize>(
        scope: SnapshotScope,
        jobs: Vec<(JobId, Vec<D>)>,
    ) -> Result<Self, ShuffleError> {
        let payload = bincode::serialize(&SnapshotPayload { jobs })
            .map_err(|e| ShuffleError::SnapshotCodec(e.to_string()))?;

        Ok(Self {
            scope,
            taken_at_ms: now_ms(),
            payload,
        })
    }

    /// Decodes the descriptor table back out of the snapshot.
    pub fn decode<D: DeserializeOwned>(&self) -> Result<Vec<(JobId, Vec<D>)>, ShuffleError> {
        let payload: SnapshotPayload<D> = bincode::deserialize(&self.payload)
            .map_err(|e| ShuffleError::SnapshotCodec(e.to_string()))?;
        Ok(payload.jobs)
    }

    pub fn is_job_scoped(&self) -> bool {
        matches!(self.scope, SnapshotScope::Job(_))
    }
}

/// Combines descriptor batches from multiple snapshots of one job into a
/// single consistent view. Later batches win per partition, matching the
/// restore contract of replacing rather than merging state.
pub fn combine_job_descriptors<D: ShuffleDescriptor>(batches: Vec<Vec<D>>) -> Vec<D> {
    let mut combined = HashMap::new();
    for batch in batches {
        for descriptor in batch {
            combined.insert(descriptor.result_partition_id().clone(), descriptor);
        }
    }
    combined.into_values().collect()
}
