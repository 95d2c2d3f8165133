//! Declarative merge specification.
//!
//! The specification describes one upsert merge as structured data: a
//! match predicate over key columns, the assignments applied when a source
//! row matches an existing target row, and the assignments used to build a
//! new row when it does not. It is the only thing the engine hands to the
//! storage collaborator, through a parameterized call. No query text is
//! ever assembled from identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The value written by one [`MergeAssignment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MergeValue {
    /// Copy the named column from the source row.
    SourceColumn {
        /// Source column name.
        column: String,
    },
    /// Write the execution instant.
    Instant {
        /// The instant, fixed at planning time for a deterministic spec.
        at: DateTime<Utc>,
    },
}

/// One column assignment inside an update or insert clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeAssignment {
    /// Target column being written.
    pub column: String,
    /// Value to write.
    pub value: MergeValue,
}

impl MergeAssignment {
    /// Assignment copying a source column of the same name.
    #[must_use]
    pub fn from_source(column: &str) -> Self {
        Self {
            column: column.to_string(),
            value: MergeValue::SourceColumn {
                column: column.to_string(),
            },
        }
    }

    /// Assignment writing the execution instant.
    #[must_use]
    pub fn instant(column: &str, at: DateTime<Utc>) -> Self {
        Self {
            column: column.to_string(),
            value: MergeValue::Instant { at },
        }
    }
}

/// A complete merge specification.
///
/// Semantics: for each source row, equality on every column in
/// `match_columns` decides the disposition. Matched rows receive the
/// `when_matched` assignments; unmatched rows are inserted from the
/// `when_not_matched` assignments. Application is atomic: all of it or
/// none of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSpec {
    /// Key columns compared for equality between source and target.
    pub match_columns: Vec<String>,
    /// Assignments applied to a matched target row.
    pub when_matched: Vec<MergeAssignment>,
    /// Assignments building the row inserted for an unmatched source row.
    pub when_not_matched: Vec<MergeAssignment>,
}

impl MergeSpec {
    /// Validates the structural invariants of the specification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdent`] if the match predicate is empty, a
    /// column is assigned twice within one clause, or an update clause
    /// rewrites one of its own match columns.
    pub fn validate(&self) -> Result<()> {
        if self.match_columns.is_empty() {
            return Err(Error::invalid_ident(
                "merge specification has no match columns",
            ));
        }
        Self::check_distinct(&self.when_matched, "when-matched")?;
        Self::check_distinct(&self.when_not_matched, "when-not-matched")?;
        for assignment in &self.when_matched {
            if self.match_columns.contains(&assignment.column) {
                return Err(Error::invalid_ident(format!(
                    "when-matched clause rewrites match column '{}'",
                    assignment.column
                )));
            }
        }
        Ok(())
    }

    fn check_distinct(assignments: &[MergeAssignment], clause: &str) -> Result<()> {
        for (i, assignment) in assignments.iter().enumerate() {
            if assignments[..i].iter().any(|a| a.column == assignment.column) {
                return Err(Error::invalid_ident(format!(
                    "{clause} clause assigns column '{}' twice",
                    assignment.column
                )));
            }
        }
        Ok(())
    }

    /// Returns whether the update clause writes the given column.
    #[must_use]
    pub fn updates_column(&self, column: &str) -> bool {
        self.when_matched.iter().any(|a| a.column == column)
    }
}
