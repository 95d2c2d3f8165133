//! Merge executor adapter.
//!
//! Submits one planned merge specification as a single atomic call
//! against the storage collaborator, scoped to a resolved reference.
//! There is no partial-application recovery here: any failure is fatal
//! to the invocation, and recovery is re-invoking the whole job.

use std::sync::Arc;

use stratum_core::catalog::{CatalogBackend, ReferenceHandle};
use stratum_core::ident::{SourceName, TableName};
use stratum_core::merge_spec::MergeSpec;
use stratum_core::Result;

/// Adapter between the planned merge and the storage collaborator.
pub struct MergeExecutor {
    catalog: Arc<dyn CatalogBackend>,
}

impl MergeExecutor {
    /// Creates an executor over the given catalog.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogBackend>) -> Self {
        Self { catalog }
    }

    /// Submits the merge as one blocking, all-or-nothing operation.
    ///
    /// Requiring a [`ReferenceHandle`] means the caller cannot reach this
    /// point without a successfully resolved reference.
    ///
    /// # Errors
    ///
    /// Surfaces the collaborator's failure untouched; see
    /// [`CatalogBackend::merge_into`] for the categories. The target
    /// table is unchanged on error.
    pub async fn execute(
        &self,
        reference: &ReferenceHandle,
        source: &SourceName,
        target: &TableName,
        spec: &MergeSpec,
    ) -> Result<()> {
        spec.validate()?;

        tracing::info!(
            source = %source,
            target = %target.qualified(),
            reference = %reference.name(),
            "submitting merge"
        );
        self.catalog.merge_into(reference, target, source, spec).await?;
        tracing::info!(target = %target.qualified(), "merge applied");
        Ok(())
    }
}
