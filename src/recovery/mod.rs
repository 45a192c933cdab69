//! Recovery Module
//!
//! Snapshot/restore protocol letting the coordinator persist its partition
//! bookkeeping and reconstruct it after a restart, instead of re-deriving it
//! from scratch.
//!
//! ## Core Mechanisms
//! - **Opaque payload**: a snapshot carries a bincode-encoded table of
//!   job -> issued descriptors. Callers treat it as bytes; only a coordinator
//!   with the same descriptor type can decode it.
//! - **Scoping**: a snapshot covers either the whole coordinator or a single
//!   job, so per-job recovery does not drag unrelated state along.
//! - **Combination**: several job-scoped snapshots (e.g., from multiple prior
//!   coordinator incarnations) combine into one view, later descriptors
//!   winning per partition.

pub mod snapshot;

#[cfg(test)]
mod tests;
