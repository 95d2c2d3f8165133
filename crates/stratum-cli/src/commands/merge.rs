//! Merge command - run one branch-scoped upsert merge.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use stratum_core::ident::DEFAULT_REF;
use stratum_merge::{JobReport, MergeJob, MergeParams};

use crate::client::RestCatalog;
use crate::{Config, OutputFormat};

/// Arguments for the merge command.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Source temp view or staging table to merge from.
    #[arg(long)]
    pub source: String,

    /// Target gold table name (unqualified, e.g. `gold_top_routes`).
    #[arg(long)]
    pub target: String,

    /// Reference (branch) to operate on.
    #[arg(long = "ref", default_value = DEFAULT_REF)]
    pub reference: String,
}

/// Execute the merge command.
///
/// # Errors
///
/// Returns an error when the parameters are invalid or the job
/// terminates failed; either way the process exits non-zero so the
/// scheduler can retry by re-invocation.
pub async fn execute(args: MergeArgs, config: &Config) -> Result<()> {
    let params = MergeParams {
        source: args.source.parse().context("invalid --source")?,
        target: args.target.parse().context("invalid --target")?,
        reference: args.reference.parse().context("invalid --ref")?,
    };

    let catalog = Arc::new(RestCatalog::new(config)?);
    let report = MergeJob::new(catalog, params).run().await;

    render(&report, config.format)?;

    match report.failure_message() {
        None => Ok(()),
        Some(message) => anyhow::bail!("merge job failed: {message}"),
    }
}

fn render(report: &JobReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).context("Failed to serialize report")?
            );
        }
        OutputFormat::Text => {
            if report.is_success() {
                println!("Merge completed successfully!");
                println!();
                println!("  Run ID:   {}", report.run_id);
                println!("  Finished: {}", report.finished_at);
            } else {
                println!("Merge failed.");
                println!();
                println!("  Run ID:    {}", report.run_id);
                if let Some(message) = report.failure_message() {
                    println!("  Cause:     {message}");
                }
                println!(
                    "  Retryable: {}",
                    if report.retryable {
                        "yes (re-invoke with identical parameters)"
                    } else {
                        "no (fix input or configuration first)"
                    }
                );
            }
        }
    }
    Ok(())
}
