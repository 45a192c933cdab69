use crate::descriptor::types::{MemorySize, TaskInputsOutputsDescriptor};

/// Per-channel memory cost model for shuffle sizing.
///
/// Fixed at coordinator construction, which keeps
/// `compute_shuffle_memory_size_for_task` deterministic for identical inputs
/// within one coordinator instance. The default policy knows nothing and
/// reports zero.
#[derive(Debug, Clone, Copy)]
pub struct SizingPolicy {
    /// Bytes reserved per input channel of a consumed result.
    pub bytes_per_input_channel: u64,
    /// Bytes reserved per subpartition of a produced result.
    pub bytes_per_output_subpartition: u64,
}

impl SizingPolicy {
    pub const NONE: SizingPolicy = SizingPolicy {
        bytes_per_input_channel: 0,
        bytes_per_output_subpartition: 0,
    };
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Computes the shuffle memory a task needs, given its fan-in/fan-out shape.
///
/// Pure function of its inputs; returns `MemorySize::ZERO` under the default
/// policy, signaling "no additional memory required".
pub fn compute_shuffle_memory_size_for_task(
    policy: SizingPolicy,
    desc: &TaskInputsOutputsDescriptor,
) -> MemorySize {
    let input_channels: u64 = desc.input_channels.iter().map(|&n| n as u64).sum();
    let output_subpartitions: u64 = desc.output_subpartitions.iter().map(|&n| n as u64).sum();

    MemorySize(
        input_channels * policy.bytes_per_input_channel
            + output_subpartitions * policy.bytes_per_output_subpartition,
    )
}
