//! Merge planner for the top-routes upsert.
//!
//! Produces the declarative merge specification: equality on the
//! composite key, the matched update clause, and the unmatched insert
//! clause. The planner is pure and deterministic; execution is delegated
//! to the storage collaborator for atomicity and scale.

use chrono::{DateTime, Utc};

use stratum_core::merge_spec::{MergeAssignment, MergeSpec};
use stratum_core::row::columns;

/// Builds the merge specification for one top-routes upsert at the given
/// execution instant.
///
/// - Match: `(pickup_zone, dropoff_zone)` equality.
/// - When matched: overwrite `route_revenue`, `rank`, and `updated_at`;
///   `created_at` stays with the original insert.
/// - When not matched: insert all source fields with
///   `created_at = updated_at = now`.
#[must_use]
pub fn route_upsert(now: DateTime<Utc>) -> MergeSpec {
    MergeSpec {
        match_columns: vec![
            columns::PICKUP_ZONE.to_string(),
            columns::DROPOFF_ZONE.to_string(),
        ],
        when_matched: vec![
            MergeAssignment::from_source(columns::ROUTE_REVENUE),
            MergeAssignment::from_source(columns::RANK),
            MergeAssignment::instant(columns::UPDATED_AT, now),
        ],
        when_not_matched: vec![
            MergeAssignment::from_source(columns::PICKUP_ZONE),
            MergeAssignment::from_source(columns::DROPOFF_ZONE),
            MergeAssignment::from_source(columns::ROUTE_REVENUE),
            MergeAssignment::from_source(columns::RANK),
            MergeAssignment::instant(columns::CREATED_AT, now),
            MergeAssignment::instant(columns::UPDATED_AT, now),
        ],
    }
}
