//! # stratum-merge
//!
//! The merge engine: plans a branch-scoped upsert merge as structured
//! data, submits it atomically through the catalog contract, and drives
//! one invocation to a terminal success or failure state.
//!
//! ## Flow
//!
//! ```text
//! MergeJob::run
//!   -> CatalogBackend::resolve_reference   (switch branch)
//!   -> plan::route_upsert                  (build the merge spec)
//!   -> MergeExecutor::execute              (one atomic merge_into)
//!   -> JobReport                           (exit signal for the scheduler)
//! ```
//!
//! Re-invoking a failed job with identical parameters is always safe:
//! the merge predicate makes re-application idempotent per key.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod executor;
pub mod job;
pub mod plan;

pub use executor::MergeExecutor;
pub use job::{JobReport, JobStage, JobState, MergeJob, MergeParams};
