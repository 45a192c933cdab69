use crate::descriptor::types::ResultPartitionId;
use serde::{Deserialize, Serialize};

/// Observed metrics for one result partition.
///
/// Currently the per-subpartition byte sizes, which is what consumers need
/// for balanced scheduling decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionMetrics {
    /// Bytes written per subpartition, indexed by subpartition number.
    pub subpartition_bytes: Vec<u64>,
}

impl PartitionMetrics {
    pub fn new(subpartition_bytes: Vec<u64>) -> Self {
        Self { subpartition_bytes }
    }

    pub fn total_bytes(&self) -> u64 {
        self.subpartition_bytes.iter().sum()
    }
}

/// A partition identifier paired with the metrics observed for it.
///
/// Produced only for partitions whose metrics were retrievable within the
/// query deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionWithMetrics {
    pub partition_id: ResultPartitionId,
    pub metrics: PartitionMetrics,
}
