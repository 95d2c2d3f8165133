//! # stratum-core
//!
//! Shared primitives for the stratum merge engine.
//!
//! This crate provides the types and contracts used across all stratum
//! components:
//!
//! - **Identifiers**: Validated names for references, tables, and source
//!   row sets
//! - **Row Model**: The top-routes schema, composite key, and field-level
//!   write policy
//! - **Merge Specification**: The declarative upsert description handed to
//!   the storage collaborator
//! - **Catalog Contract**: The trait the versioned table store implements
//! - **Error Types**: The invocation-fatal failure taxonomy
//!
//! ## Crate Boundary
//!
//! `stratum-core` is the only crate allowed to define shared primitives.
//! The merge engine and the invocation surface interact with the storage
//! collaborator exclusively through the contracts defined here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod ident;
pub mod memory;
pub mod merge_spec;
pub mod observability;
pub mod row;

pub use catalog::{CatalogBackend, ReferenceHandle};
pub use error::{Error, ExecutionFailure, Result};
pub use ident::{RefName, SourceName, TableName, DEFAULT_REF, TABLE_NAMESPACE};
pub use merge_spec::{MergeAssignment, MergeSpec, MergeValue};
pub use row::{MergeFields, RouteKey, SourceRow, TargetRow};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::{CatalogBackend, ReferenceHandle};
    pub use crate::error::{Error, ExecutionFailure, Result};
    pub use crate::ident::{RefName, SourceName, TableName};
    pub use crate::merge_spec::{MergeAssignment, MergeSpec, MergeValue};
    pub use crate::row::{MergeFields, RouteKey, SourceRow, TargetRow};
}
