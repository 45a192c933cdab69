//! Partition Descriptor Model
//!
//! Immutable value objects describing partition identity and producer location.
//! Every other subsystem consumes these types; none of them carry runtime
//! state or mutate after construction.
//!
//! ## Identity Model
//! - **`JobId`**: the owning job, assigned by the control plane.
//! - **`ResultPartitionId`**: one produced slice of an intermediate result.
//!   Combines the job-graph-level partition identity with the producing
//!   execution attempt, so a re-deployed producer yields a fresh identity.
//! - **`PartitionDescriptor`**: job-graph information (which intermediate
//!   result, how many subpartitions, blocking vs pipelined).
//! - **`ProducerDescriptor`**: execution identity plus network location of
//!   the task that writes the partition.

pub mod types;

#[cfg(test)]
mod tests;
