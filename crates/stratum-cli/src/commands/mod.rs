//! CLI command implementations.

pub mod merge;
