use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Unique identifier of a job registered with the coordinator.
///
/// Wrapper around a UUID string. The control plane owns job identity; the
/// coordinator only keys its bookkeeping by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    /// Generates a new random UUID v4-based JobId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a logical intermediate result in the job graph.
///
/// All parallel subtasks of one producer vertex write partitions of the same
/// intermediate result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IntermediateResultId(pub String);

impl IntermediateResultId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Identifier of one execution attempt of a producer task.
///
/// A restarted producer gets a new attempt id, which distinguishes stale
/// partition registrations from current ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ExecutionAttemptId(pub String);

impl ExecutionAttemptId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Globally unique identity of one produced result partition.
///
/// Combines the job-graph partition identity with the producing execution
/// attempt. This is the key all partition bookkeeping is indexed by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResultPartitionId {
    pub result_id: IntermediateResultId,
    pub producer_attempt: ExecutionAttemptId,
}

impl ResultPartitionId {
    pub fn new(result_id: IntermediateResultId, producer_attempt: ExecutionAttemptId) -> Self {
        Self {
            result_id,
            producer_attempt,
        }
    }
}

impl fmt::Display for ResultPartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.result_id.0, self.producer_attempt.0)
    }
}

/// Consumption mode of a partition.
///
/// `Blocking` partitions are fully materialized before consumption (batch
/// jobs) and typically occupy external storage that outlives the producer.
/// `Pipelined` partitions are streamed and hold producer-local resources
/// only. `BlockingPersistent` marks cluster partitions that must survive job
/// termination until released explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PartitionKind {
    Blocking,
    BlockingPersistent,
    Pipelined,
}

impl PartitionKind {
    /// Whether the partition's resources outlive the owning job.
    pub fn is_cluster_persistent(self) -> bool {
        matches!(self, PartitionKind::BlockingPersistent)
    }
}

/// Job-graph-level description of a partition, independent of any runtime
/// location. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    /// Which logical intermediate result this partition belongs to.
    pub result_id: IntermediateResultId,
    /// Number of subpartitions (one per consuming subtask).
    pub num_subpartitions: u32,
    /// Blocking vs pipelined consumption.
    pub kind: PartitionKind,
}

/// Description of the producing task: execution identity and network
/// location. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerDescriptor {
    /// Execution attempt that writes the partition.
    pub attempt_id: ExecutionAttemptId,
    /// Address of the task executor hosting the producer.
    pub address: SocketAddr,
    /// Port the shuffle data service listens on. Zero means the producer
    /// exposes no data endpoint.
    pub data_port: u16,
}

/// A memory amount in bytes, used for shuffle sizing hints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemorySize(pub u64);

impl MemorySize {
    pub const ZERO: MemorySize = MemorySize(0);

    pub fn bytes(self) -> u64 {
        self.0
    }

    pub fn add(self, other: MemorySize) -> MemorySize {
        MemorySize(self.0 + other.0)
    }
}

/// Fan-in/fan-out shape of a task, used purely as input to the shuffle
/// memory sizing computation. Carries no identity and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInputsOutputsDescriptor {
    /// Number of input channels per consumed result.
    pub input_channels: Vec<u32>,
    /// Number of subpartitions per produced result.
    pub output_subpartitions: Vec<u32>,
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
