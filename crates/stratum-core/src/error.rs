//! Error types and result alias for stratum.
//!
//! Every failure in a merge invocation falls into one of four categories.
//! The category determines whether an external scheduler should retry the
//! job by re-invocation: only [`Error::Execution`] failures are safe to
//! retry, because the merge predicate is idempotent per key.

use std::fmt;

/// The result type used throughout stratum.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a merge invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A source row is missing a required field or carries a wrongly-typed
    /// value. Not retryable without fixing the input.
    #[error("schema error: {message}")]
    Schema {
        /// Description of the malformed field.
        message: String,
    },

    /// The requested reference (branch) is unknown or invalid. Not
    /// retryable without fixing the configuration.
    #[error("reference error on '{name}': {message}")]
    Reference {
        /// The reference name that failed to resolve.
        name: String,
        /// Description of the resolution failure.
        message: String,
    },

    /// The composite-key uniqueness invariant was violated, either inside
    /// one source batch or in the target table. Requires manual
    /// remediation; never retried.
    #[error("data integrity error: {message}")]
    DataIntegrity {
        /// Description of the violated invariant.
        message: String,
    },

    /// Merge submission failed in a transient or environmental way. Safe
    /// to retry by re-invoking the whole job with identical parameters.
    #[error("execution error ({kind}): {message}")]
    Execution {
        /// The failure category reported by the collaborator.
        kind: ExecutionFailure,
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A malformed table or source identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidIdent {
        /// Description of what made the identifier invalid.
        message: String,
    },
}

/// Categories of execution failure surfaced by the storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFailure {
    /// Catalog or network connectivity failure.
    Connectivity,
    /// Concurrent-write conflict on the resolved reference.
    Conflict,
    /// The collaborator timed out the merge call.
    Timeout,
    /// A storage-side constraint rejected the merge.
    Constraint,
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connectivity => "connectivity",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Constraint => "constraint",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Creates a new schema error with the given message.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates a new reference error for the given reference name.
    #[must_use]
    pub fn reference(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reference {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new data integrity error with the given message.
    #[must_use]
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    /// Creates a new execution error without an underlying cause.
    #[must_use]
    pub fn execution(kind: ExecutionFailure, message: impl Into<String>) -> Self {
        Self::Execution {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new execution error with a source cause.
    #[must_use]
    pub fn execution_with_source(
        kind: ExecutionFailure,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Execution {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid identifier error.
    #[must_use]
    pub fn invalid_ident(message: impl Into<String>) -> Self {
        Self::InvalidIdent {
            message: message.into(),
        }
    }

    /// Returns whether re-invoking the job with identical parameters is a
    /// safe recovery for this error.
    ///
    /// Only execution failures are retryable; schema, reference, and
    /// integrity failures need a human first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}
