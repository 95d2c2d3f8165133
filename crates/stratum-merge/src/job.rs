//! Job controller for one merge invocation.
//!
//! Drives resolve -> plan -> execute -> report as a small state machine.
//! Every error is invocation-fatal; the controller never retries. The
//! catalog session is released on every exit path before the terminal
//! state is reported, so an external scheduler can re-invoke the job
//! safely on a non-zero signal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use stratum_core::catalog::CatalogBackend;
use stratum_core::ident::{RefName, SourceName, TableName};
use stratum_core::{observability, Error};

use crate::executor::MergeExecutor;
use crate::plan;

/// Parameters of one merge invocation.
#[derive(Debug, Clone)]
pub struct MergeParams {
    /// Row set to merge from.
    pub source: SourceName,
    /// Destination table, unqualified.
    pub target: TableName,
    /// Reference the whole run is scoped to.
    pub reference: RefName,
}

/// The stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Switching the active reference.
    ResolveReference,
    /// Submitting the merge to the collaborator.
    SubmitMerge,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ResolveReference => "reference switch",
            Self::SubmitMerge => "merge submission",
        };
        f.write_str(label)
    }
}

/// Lifecycle states of one invocation.
///
/// `Start` is initial; `Succeeded` and `Failed` are terminal. Reference
/// resolution strictly precedes merge submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Invocation created, nothing resolved yet.
    Start,
    /// The reference was switched successfully.
    ReferenceResolved,
    /// The merge was handed to the collaborator.
    MergeSubmitted,
    /// Terminal: the merge was fully applied.
    Succeeded,
    /// Terminal: the invocation failed; the target table is unchanged.
    Failed,
}

/// Terminal report of one invocation, finalized exactly once.
///
/// Never persisted; it only drives the process exit signal and the
/// operator-facing output.
#[derive(Debug, Serialize)]
pub struct JobReport {
    /// Unique id of this invocation, for log correlation.
    pub run_id: Uuid,
    /// Terminal state.
    pub state: JobState,
    /// Stage the failure originated from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<JobStage>,
    /// Rendered error chain, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether re-invocation with identical parameters is safe recovery.
    pub retryable: bool,
    /// Invocation start instant.
    pub started_at: DateTime<Utc>,
    /// Invocation end instant.
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    /// Whether the invocation reached `Succeeded`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded
    }

    /// Exit signal for the invoking scheduler: 0 on success, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Operator-facing failure description naming the failing stage.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        match (self.failed_stage, &self.error) {
            (Some(stage), Some(error)) => Some(format!("{stage} failed: {error}")),
            (None, Some(error)) => Some(error.clone()),
            _ => None,
        }
    }
}

/// Controller for one merge invocation.
pub struct MergeJob {
    catalog: Arc<dyn CatalogBackend>,
    params: MergeParams,
}

impl MergeJob {
    /// Creates a job over the given catalog and parameters.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogBackend>, params: MergeParams) -> Self {
        Self { catalog, params }
    }

    /// Runs the invocation to a terminal state.
    ///
    /// Infallible by design: every error is captured into the report, and
    /// the catalog session is closed on every path before returning.
    pub async fn run(&self) -> JobReport {
        let run_id = Uuid::new_v4();
        let span = observability::job_span(
            &run_id.to_string(),
            self.params.reference.as_str(),
            self.params.target.as_str(),
        );
        self.run_to_completion(run_id).instrument(span).await
    }

    async fn run_to_completion(&self, run_id: Uuid) -> JobReport {
        let started_at = Utc::now();
        let mut state = JobState::Start;

        let outcome = self.drive(&mut state).await;

        // Session release is unconditional and never masks the primary
        // error.
        if let Err(close_err) = self.catalog.close().await {
            tracing::warn!(error = %close_err, "failed to release catalog session");
        }

        match outcome {
            Ok(()) => {
                state = JobState::Succeeded;
                tracing::info!("merge job succeeded");
                JobReport {
                    run_id,
                    state,
                    failed_stage: None,
                    error: None,
                    retryable: false,
                    started_at,
                    finished_at: Utc::now(),
                }
            }
            Err((stage, error)) => {
                state = JobState::Failed;
                tracing::error!(stage = %stage, error = %error, "merge job failed");
                JobReport {
                    run_id,
                    state,
                    failed_stage: Some(stage),
                    error: Some(render_error_chain(&error)),
                    retryable: error.is_retryable(),
                    started_at,
                    finished_at: Utc::now(),
                }
            }
        }
    }

    async fn drive(&self, state: &mut JobState) -> Result<(), (JobStage, Error)> {
        tracing::info!(reference = %self.params.reference, "switching reference");
        let handle = self
            .catalog
            .resolve_reference(&self.params.reference)
            .await
            .map_err(|e| (JobStage::ResolveReference, e))?;
        *state = JobState::ReferenceResolved;
        tracing::debug!(
            token = handle.token(),
            resolved_at = %handle.resolved_at(),
            "reference resolved"
        );

        let spec = plan::route_upsert(Utc::now());
        let executor = MergeExecutor::new(Arc::clone(&self.catalog));
        *state = JobState::MergeSubmitted;
        executor
            .execute(&handle, &self.params.source, &self.params.target, &spec)
            .await
            .map_err(|e| (JobStage::SubmitMerge, e))?;

        Ok(())
    }
}

/// Renders an error with its full source chain.
fn render_error_chain(error: &Error) -> String {
    let mut rendered = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
