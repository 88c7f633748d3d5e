// crates/server/src/jobs/mod.rs
//! Asynchronous download jobs.
//!
//! Provides:
//! - `JobStore` — in-memory map of tracked jobs
//! - `spawn_worker` — one supervised task per accepted job
//! - `reap`/`run_sweeper` — expiry of stale jobs and their directories
//! - wire types (`JobSnapshot`, `JobFile`, `JobStatus`)

pub mod reaper;
pub mod store;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use reaper::{reap, run_sweeper, ReapOutcome};
pub use store::JobStore;
pub use types::{Job, JobFile, JobSnapshot, JobStatus};
pub use worker::spawn_worker;
