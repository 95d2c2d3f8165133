//! The storage/catalog collaborator contract.
//!
//! The merge engine talks to the versioned table store through this
//! trait and nothing else. Implementations own the tables, the
//! references, snapshot isolation, and conflict detection; the engine
//! owns only the single invocation driving them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ident::{RefName, SourceName, TableName};
use crate::merge_spec::MergeSpec;

/// Proof that a reference was resolved against the catalog.
///
/// Handles are produced only by [`CatalogBackend::resolve_reference`];
/// every table access requires one, so no operation can run against an
/// unresolved or implicit reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceHandle {
    name: RefName,
    token: String,
    resolved_at: DateTime<Utc>,
}

impl ReferenceHandle {
    /// Creates a handle for a resolved reference.
    ///
    /// `token` is the catalog's opaque position marker for the reference
    /// (commit hash, generation counter) at resolution time.
    #[must_use]
    pub fn new(name: RefName, token: impl Into<String>) -> Self {
        Self {
            name,
            token: token.into(),
            resolved_at: Utc::now(),
        }
    }

    /// The resolved reference name.
    #[must_use]
    pub fn name(&self) -> &RefName {
        &self.name
    }

    /// The catalog's opaque position token at resolution time.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// When the reference was resolved.
    #[must_use]
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

/// Versioned table store exposed by the storage collaborator.
///
/// All implementations must make [`merge_into`](Self::merge_into) atomic
/// from the caller's perspective: the merge is fully applied or not at
/// all, even if the backend batches or parallelizes internally.
#[async_trait]
pub trait CatalogBackend: Send + Sync + 'static {
    /// Resolves a named reference so subsequent operations are scoped to
    /// one consistent snapshot of the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reference`](crate::Error::Reference) if the
    /// reference does not exist or cannot be activated.
    async fn resolve_reference(&self, name: &RefName) -> Result<ReferenceHandle>;

    /// Applies one merge specification to `target`, reading source rows
    /// from the row set named `source`, scoped to the resolved reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`](crate::Error::Execution) for
    /// connectivity, conflict, timeout, or constraint failures;
    /// [`Error::Schema`](crate::Error::Schema) if source rows are
    /// malformed; [`Error::DataIntegrity`](crate::Error::DataIntegrity)
    /// if a key-uniqueness violation is detected. On any error the target
    /// table is unchanged.
    async fn merge_into(
        &self,
        reference: &ReferenceHandle,
        target: &TableName,
        source: &SourceName,
        spec: &MergeSpec,
    ) -> Result<()>;

    /// Releases any session state held for this invocation.
    ///
    /// Called on every exit path, success or failure. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`](crate::Error::Execution) if the
    /// session cannot be released cleanly.
    async fn close(&self) -> Result<()>;
}
