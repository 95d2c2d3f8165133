//! # stratum-cli
//!
//! Command-line interface for the stratum merge job.
//!
//! ## Commands
//!
//! - `stratum merge` - Run one branch-scoped upsert merge
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `STRATUM_CATALOG_URL` - Catalog endpoint (default: `http://localhost:8080`)
//! - `STRATUM_CATALOG_TOKEN` - Catalog authentication token
//!
//! The process exits `0` when the merge job succeeds and `1` otherwise,
//! so an orchestrator can retry by re-invocation with identical
//! parameters.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod client;
pub mod commands;

use clap::{Parser, Subcommand};

/// Stratum CLI - versioned-table merge jobs.
#[derive(Debug, Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog endpoint URL.
    #[arg(long, env = "STRATUM_CATALOG_URL", default_value = "http://localhost:8080")]
    pub catalog_url: String,

    /// Catalog authentication token.
    #[arg(long, env = "STRATUM_CATALOG_TOKEN")]
    pub catalog_token: Option<String>,

    /// Emit JSON logs instead of human-readable ones.
    #[arg(long, env = "STRATUM_LOG_JSON")]
    pub log_json: bool,

    /// Output format for the job report.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            catalog_url: self.catalog_url.clone(),
            catalog_token: self.catalog_token.clone(),
            format: self.format,
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one branch-scoped upsert merge.
    Merge(commands::merge::MergeArgs),
}

/// Output format for the job report.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Catalog endpoint URL.
    pub catalog_url: String,
    /// Catalog authentication token.
    pub catalog_token: Option<String>,
    /// Output format for the job report.
    pub format: OutputFormat,
}
