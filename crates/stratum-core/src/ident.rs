//! Validated identifiers for references, tables, and source row sets.
//!
//! All identifiers are newtypes validated at the boundary, so the rest of
//! the engine never handles a raw, possibly-malformed string. None of them
//! are ever spliced into query text; they travel as structured fields of
//! the catalog contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Namespace every target table lives under. The job never writes outside
/// this catalog/schema pair.
pub const TABLE_NAMESPACE: &str = "stratum.gold";

/// The default reference when the caller does not name one.
pub const DEFAULT_REF: &str = "main";

fn valid_ident_chars(s: &str, extra: &[char]) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || extra.contains(&c))
}

/// A named, reassignable pointer to one snapshot of the versioned table
/// store (a branch).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Creates a validated reference name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reference`] if the name is empty or contains
    /// characters outside `[A-Za-z0-9_./-]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if valid_ident_chars(&name, &['-', '.', '/']) {
            Ok(Self(name))
        } else {
            Err(Error::reference(
                name,
                "reference name must be a non-empty identifier",
            ))
        }
    }

    /// Returns the default reference, `main`.
    #[must_use]
    pub fn main() -> Self {
        Self(DEFAULT_REF.to_string())
    }

    /// Returns the reference name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An unqualified target table name under [`TABLE_NAMESPACE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a validated table name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdent`] if the name is empty, qualified
    /// (contains `.`), or contains characters outside `[A-Za-z0-9_]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if valid_ident_chars(&name, &[]) {
            Ok(Self(name))
        } else {
            Err(Error::invalid_ident(format!(
                "table name '{name}' must be a non-empty unqualified identifier"
            )))
        }
    }

    /// Returns the unqualified name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name qualified under the fixed namespace, e.g.
    /// `stratum.gold.top_routes`.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{TABLE_NAMESPACE}.{}", self.0)
    }
}

/// The identifier of the row set to merge from (a temp view or staging
/// table registered with the execution engine).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceName(String);

impl SourceName {
    /// Creates a validated source row-set name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdent`] if the name is empty or contains
    /// characters outside `[A-Za-z0-9_]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if valid_ident_chars(&name, &[]) {
            Ok(Self(name))
        } else {
            Err(Error::invalid_ident(format!(
                "source name '{name}' must be a non-empty identifier"
            )))
        }
    }

    /// Returns the source name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RefName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for RefName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(v: RefName) -> String {
        v.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<TableName> for String {
    fn from(v: TableName) -> String {
        v.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SourceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SourceName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<SourceName> for String {
    fn from(v: SourceName) -> String {
        v.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_name_accepts_branch_like_names() {
        assert!(RefName::new("main").is_ok());
        assert!(RefName::new("etl/backfill-2026.08").is_ok());
        assert_eq!(RefName::main().as_str(), "main");
    }

    #[test]
    fn ref_name_rejects_empty_and_spaces() {
        assert!(matches!(RefName::new(""), Err(Error::Reference { .. })));
        assert!(matches!(
            RefName::new("feature branch"),
            Err(Error::Reference { .. })
        ));
    }

    #[test]
    fn table_name_is_unqualified() {
        let table = TableName::new("gold_top_routes").unwrap();
        assert_eq!(table.qualified(), "stratum.gold.gold_top_routes");
        assert!(matches!(
            TableName::new("nessie.etl.gold_top_routes"),
            Err(Error::InvalidIdent { .. })
        ));
    }

    #[test]
    fn idents_round_trip_through_str() {
        let source: SourceName = "tmp_top_routes".parse().unwrap();
        assert_eq!(source.to_string(), "tmp_top_routes");
        assert!("".parse::<SourceName>().is_err());
    }
}
