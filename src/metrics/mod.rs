//! Metrics & Sizing Module
//!
//! Bounded-time retrieval of partition metrics and task-level shuffle memory
//! sizing hints.
//!
//! ## Core Mechanisms
//! - **Deadline race**: `gather_partition_metrics` spawns one fetch per
//!   expected partition and collects results until a hard deadline, then
//!   returns whatever subset arrived. Slow or unreachable partitions are
//!   omitted; the call itself never fails.
//! - **Push and pull**: producers push size reports to the coordinator, and
//!   the coordinator can pull them over HTTP with bounded retries.
//! - **Sizing**: `compute_shuffle_memory_size_for_task` is a pure function of
//!   the task shape and the configured `SizingPolicy`; with no sizing
//!   knowledge it returns zero ("no additional memory required").
//!
//! ## Submodules
//! - **`types`**: metric value objects.
//! - **`fetch`**: the `MetricsFetch` seam and the HTTP pull client.
//! - **`sizing`**: the memory sizing policy.
//! - **`query`**: the deadline-raced gather.

pub mod fetch;
pub mod query;
pub mod sizing;
pub mod types;

#[cfg(test)]
mod tests;
