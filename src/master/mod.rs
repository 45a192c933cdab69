//! Shuffle Master Module
//!
//! The coordinator facade the control plane talks to. Wires the job
//! registry, partition registry, metrics gather and snapshot machinery into
//! the single capability surface of the shuffle service.
//!
//! ## Architecture Overview
//! 1. **Lifecycle**: `start` spawns the maintenance loop; `close` tears
//!    everything down when the cluster shuts down.
//! 2. **Job lifecycle**: job registration opens the partition table, job
//!    unregistration releases everything except cluster-persistent
//!    partitions.
//! 3. **Capabilities**: metrics and snapshot support are resolved once at
//!    construction; absent capabilities degrade to documented no-ops instead
//!    of failures.
//!
//! ## Submodules
//! - **`service`**: the `ShuffleMaster` facade itself.
//! - **`protocol`**: HTTP API contracts for the control surface.
//! - **`handlers`**: axum handlers exposing the facade over HTTP.

pub mod handlers;
pub mod protocol;
pub mod service;
