//! Partition Registry Module
//!
//! Implements the asynchronous registration/release protocol binding a
//! partition descriptor and its producer to an opaque, transport-specific
//! shuffle descriptor.
//!
//! ## Core Mechanisms
//! - **Registration**: `register_partition_with_producer` resolves exactly
//!   once, with either a descriptor or a distinguishable failure. Distinct
//!   partitions of one job register concurrently; a second in-flight
//!   registration for the same partition is rejected outright.
//! - **Release**: `release_partition_externally` is fire-and-forget and fully
//!   idempotent. External release is independent of (and order-agnostic with)
//!   the producer releasing its local resources.
//! - **Backend seam**: the concrete transport lives behind `ShuffleBackend`;
//!   the registry only tracks which descriptor was issued for which
//!   partition.
//!
//! ## Submodules
//! - **`backend`**: the `ShuffleDescriptor`/`ShuffleBackend` traits and the
//!   in-memory reference backend.
//! - **`registry`**: per-job partition bookkeeping and the registration
//!   protocol itself.

pub mod backend;
pub mod registry;

#[cfg(test)]
mod tests;
