//! Job Registry Module
//!
//! Tracks which jobs are active with the coordinator and the per-job context
//! the control plane handed over at registration.
//!
//! ## Core Mechanisms
//! - **Registration**: `register_job` is an idempotent upsert; a later call
//!   for the same job replaces the context (e.g., after a control-plane
//!   failover the callback channel changes).
//! - **Unregistration**: marks the job terminated and is a silent no-op for
//!   unknown jobs. Job state is never mutated afterwards except by recovery
//!   restore.
//! - **Lost-partition channel**: each `JobShuffleContext` carries a send-only
//!   notification channel back to the control plane, so the coordinator can
//!   report unavailable partitions before consumers fail on them.
//! - **Recovery phases**: a per-job state machine gating snapshot capture and
//!   restore (`Running` -> `SnapshotRequested` -> `SnapshotComplete`;
//!   `Running` -> `RestorePending` -> `Restored`).

pub mod context;
pub mod registry;
