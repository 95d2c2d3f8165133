//! Stratum CLI - merge job entry point.
//!
//! Exits `0` when the merge job succeeds, non-zero otherwise, so an
//! external orchestrator can decide on retry.

use anyhow::Result;
use clap::Parser;

use stratum_cli::{Cli, Commands};
use stratum_core::observability::{init_logging, LogFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Merge(args) => stratum_cli::commands::merge::execute(args, &config).await,
        }
    })
}
