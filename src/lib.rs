//! Shuffle Coordination Service Library
//!
//! This library crate defines the coordination layer between a distributed
//! job's control plane and the shuffle subsystem exchanging intermediate
//! result partitions between producer and consumer tasks. It tracks the
//! lifecycle of partitions (registration, release, recovery, metrics)
//! while staying agnostic to how partition bytes actually move.
//!
//! ## Architecture Modules
//! - **`descriptor`**: immutable value objects for partition and producer
//!   identity.
//! - **`error`**: the distinguishable failure taxonomy of the coordinator.
//! - **`job`**: job registration, per-job recovery phases, and the
//!   lost-partition notification channel back to the control plane.
//! - **`partition`**: the asynchronous registration/release protocol and the
//!   pluggable `ShuffleBackend` seam hiding the concrete transport.
//! - **`metrics`**: bounded-time partition metrics retrieval and shuffle
//!   memory sizing.
//! - **`recovery`**: opaque snapshots of the coordinator's bookkeeping and
//!   their restore semantics.
//! - **`master`**: the `ShuffleMaster` facade and its HTTP control surface.

pub mod descriptor;
pub mod error;
pub mod job;
pub mod master;
pub mod metrics;
pub mod partition;
pub mod recovery;
