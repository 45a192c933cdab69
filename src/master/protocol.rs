//! Control-Plane HTTP Protocol
//!
//! Endpoint constants and Data Transfer Objects (DTOs) for the coordinator's
//! HTTP control surface. The control plane and producer executors speak this
//! protocol; partition bytes never travel through it.

use crate::descriptor::types::{JobId, PartitionDescriptor, ProducerDescriptor, ResultPartitionId};
use crate::metrics::types::{PartitionMetrics, PartitionWithMetrics};
use crate::partition::backend::LocalShuffleDescriptor;
use crate::recovery::snapshot::ShuffleMasterSnapshot;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// --- API Endpoints ---

/// Registers a job with the coordinator.
pub const ENDPOINT_JOB_REGISTER: &str = "/job/register";
/// Unregisters a job; its non-persistent resources become releasable.
pub const ENDPOINT_JOB_UNREGISTER: &str = "/job/unregister";
/// Announces that partition recovery for a job is starting.
pub const ENDPOINT_JOB_RECOVERY_STARTED: &str = "/job/recovery_started";
/// Registers one partition and its producer.
pub const ENDPOINT_PARTITION_REGISTER: &str = "/partition/register";
/// Releases a partition's external resources.
pub const ENDPOINT_PARTITION_RELEASE: &str = "/partition/release";
/// Reports partitions observed as lost.
pub const ENDPOINT_PARTITION_LOST: &str = "/partition/lost";
/// Bounded-time partition metrics query.
pub const ENDPOINT_METRICS_QUERY: &str = "/metrics/query";
/// Producers push partition size reports here.
pub const ENDPOINT_METRICS_REPORT: &str = "/internal/metrics/report";
/// Triggers a snapshot, whole-coordinator or job-scoped.
pub const ENDPOINT_SNAPSHOT: &str = "/snapshot";
/// Restores bookkeeping from previously taken snapshots.
pub const ENDPOINT_RESTORE: &str = "/restore";
/// Operational counters.
pub const ENDPOINT_STATUS: &str = "/status";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterJobRequest {
    pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnregisterJobRequest {
    pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecoveryStartedRequest {
    pub job_id: JobId,
}

/// Registration of one partition with its producer. Mirrors the in-process
/// `register_partition_with_producer` operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPartitionRequest {
    pub job_id: JobId,
    pub partition: PartitionDescriptor,
    pub producer: ProducerDescriptor,
}

/// Result of a partition registration. Exactly one of `descriptor`/`error`
/// is set; `error` keeps the failure cause distinguishable across the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPartitionResponse {
    pub descriptor: Option<LocalShuffleDescriptor>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleasePartitionRequest {
    pub descriptor: LocalShuffleDescriptor,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartitionLostRequest {
    pub job_id: JobId,
    pub partitions: HashSet<ResultPartitionId>,
}

/// Size report pushed by a producer for one of its partitions.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsReportRequest {
    pub partition_id: ResultPartitionId,
    pub metrics: PartitionMetrics,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsQueryRequest {
    pub job_id: JobId,
    /// Hard deadline for the whole query, in milliseconds.
    pub timeout_ms: u64,
    pub partitions: HashSet<ResultPartitionId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsQueryResponse {
    pub partitions: Vec<PartitionWithMetrics>,
}

/// Snapshot trigger. Without a `job_id` the whole coordinator is captured.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub job_id: Option<JobId>,
}

/// `snapshot` is `None` when the coordinator does not support snapshots.
/// That is the capability-unsupported no-op, not an error.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot: Option<ShuffleMasterSnapshot>,
}

/// Restore trigger. With a `job_id`, the snapshots are combined into that
/// job's state; without one, the first snapshot replaces everything.
#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub snapshots: Vec<ShuffleMasterSnapshot>,
    pub job_id: Option<JobId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub jobs: usize,
    pub partitions: usize,
    pub supports_batch_snapshot: bool,
}
