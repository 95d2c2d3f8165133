//! Failure injection for the job controller.
//!
//! # Invariants Tested
//!
//! 1. An unknown reference terminates the invocation `Failed` with a
//!    reference error and the target table unchanged
//! 2. A mid-flight execution failure leaves the target unchanged
//!    (all-or-nothing) and is reported retryable
//! 3. The catalog session is released on every exit path
//! 4. Re-invocation after a transient failure converges to the same end
//!    state as a single clean run

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use stratum_core::catalog::{CatalogBackend, ReferenceHandle};
use stratum_core::memory::MemoryCatalog;
use stratum_core::{Error, ExecutionFailure, RefName, Result, SourceName, TableName};
use stratum_merge::{JobStage, JobState, MergeJob, MergeParams};

// ============================================================================
// FailingCatalog - configurable failure injection
// ============================================================================

/// Catalog wrapper that injects a merge failure and counts session
/// releases.
struct FailingCatalog {
    inner: MemoryCatalog,
    fail_merge: AtomicBool,
    close_calls: AtomicUsize,
}

impl FailingCatalog {
    fn new() -> Self {
        Self {
            inner: MemoryCatalog::new(),
            fail_merge: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    fn fail_next_merge(&self, fail: bool) {
        self.fail_merge.store(fail, Ordering::SeqCst);
    }

    fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogBackend for FailingCatalog {
    async fn resolve_reference(&self, name: &RefName) -> Result<ReferenceHandle> {
        self.inner.resolve_reference(name).await
    }

    async fn merge_into(
        &self,
        reference: &ReferenceHandle,
        target: &TableName,
        source: &SourceName,
        spec: &stratum_core::MergeSpec,
    ) -> Result<()> {
        if self.fail_merge.load(Ordering::SeqCst) {
            return Err(Error::execution(
                ExecutionFailure::Timeout,
                "injected merge submission failure",
            ));
        }
        self.inner.merge_into(reference, target, source, spec).await
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

fn params() -> MergeParams {
    MergeParams {
        source: "tmp_top_routes".parse().unwrap(),
        target: "gold_top_routes".parse().unwrap(),
        reference: "main".parse().unwrap(),
    }
}

fn record(pickup: &str, dropoff: &str, revenue: f64, rank: i64) -> Map<String, Value> {
    let Value::Object(map) = json!({
        "pickup_zone": pickup,
        "dropoff_zone": dropoff,
        "route_revenue": revenue,
        "rank": rank,
    }) else {
        unreachable!()
    };
    map
}

#[tokio::test]
async fn scenario_c_unknown_reference_leaves_the_target_unchanged() {
    let catalog = Arc::new(FailingCatalog::new());
    catalog
        .inner
        .register_view(&params().source, vec![record("Z1", "Z2", 100.0, 1)]);

    let mut run_params = params();
    run_params.reference = "does-not-exist".parse().unwrap();
    let report = MergeJob::new(catalog.clone(), run_params).run().await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.failed_stage, Some(JobStage::ResolveReference));
    assert_eq!(report.exit_code(), 1);
    assert!(!report.retryable, "a bad reference needs configuration, not retry");
    assert!(catalog
        .inner
        .table_rows(&RefName::main(), &params().target)
        .unwrap()
        .is_empty());
    assert_eq!(catalog.close_calls(), 1);
}

#[tokio::test]
async fn scenario_d_midflight_failure_is_all_or_nothing() {
    let catalog = Arc::new(FailingCatalog::new());
    catalog
        .inner
        .register_view(&params().source, vec![record("Z1", "Z2", 100.0, 1)]);
    catalog.fail_next_merge(true);

    let report = MergeJob::new(catalog.clone(), params()).run().await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.failed_stage, Some(JobStage::SubmitMerge));
    assert_eq!(report.exit_code(), 1);
    assert!(report.retryable);
    let message = report.failure_message().unwrap();
    assert!(message.contains("merge submission"), "got: {message}");
    assert!(
        catalog
            .inner
            .table_rows(&RefName::main(), &params().target)
            .unwrap()
            .is_empty(),
        "a failed submission must not partially apply"
    );
    assert_eq!(catalog.close_calls(), 1);
}

#[tokio::test]
async fn retry_after_transient_failure_converges() {
    // Failed attempt, then a clean re-invocation with identical
    // parameters. Each invocation gets a fresh session, as the scheduler
    // would provide.
    let clean = Arc::new(MemoryCatalog::new());
    clean.register_view(&params().source, vec![record("Z1", "Z2", 100.0, 1)]);
    let clean_report = MergeJob::new(clean.clone(), params()).run().await;
    assert!(clean_report.is_success());

    let flaky = Arc::new(FailingCatalog::new());
    flaky
        .inner
        .register_view(&params().source, vec![record("Z1", "Z2", 100.0, 1)]);
    flaky.fail_next_merge(true);
    let first = MergeJob::new(flaky.clone(), params()).run().await;
    assert_eq!(first.state, JobState::Failed);

    let retry = Arc::new(FailingCatalog::new());
    retry
        .inner
        .register_view(&params().source, vec![record("Z1", "Z2", 100.0, 1)]);
    let second = MergeJob::new(retry.clone(), params()).run().await;
    assert!(second.is_success());

    let expected: Vec<_> = clean
        .table_rows(&RefName::main(), &params().target)
        .unwrap()
        .into_iter()
        .map(|mut row| {
            // Timestamps differ across invocations; compare the stable
            // fields.
            row.remove("created_at");
            row.remove("updated_at");
            row
        })
        .collect();
    let actual: Vec<_> = retry
        .inner
        .table_rows(&RefName::main(), &params().target)
        .unwrap()
        .into_iter()
        .map(|mut row| {
            row.remove("created_at");
            row.remove("updated_at");
            row
        })
        .collect();
    assert_eq!(expected, actual);
}
