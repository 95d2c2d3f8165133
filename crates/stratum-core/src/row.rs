//! Row and field model for the top-routes table.
//!
//! Defines the composite match key and the field-level write policy: which
//! fields are copied from source and which are system-generated. The
//! update set deliberately has no `created_at` slot, so the creation
//! timestamp can never be reassigned by a matched merge.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Column names of the top-routes schema.
pub mod columns {
    /// Pickup zone, first half of the composite key.
    pub const PICKUP_ZONE: &str = "pickup_zone";
    /// Dropoff zone, second half of the composite key.
    pub const DROPOFF_ZONE: &str = "dropoff_zone";
    /// Aggregated revenue for the route.
    pub const ROUTE_REVENUE: &str = "route_revenue";
    /// Revenue rank of the route within the batch.
    pub const RANK: &str = "rank";
    /// Instant the row was first inserted. Never updated.
    pub const CREATED_AT: &str = "created_at";
    /// Instant the row was last written.
    pub const UPDATED_AT: &str = "updated_at";
}

/// The composite match key: `(pickup_zone, dropoff_zone)`.
///
/// Comparison is exact and case-sensitive, no normalization. At most one
/// target row may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    /// Pickup zone identifier.
    pub pickup_zone: String,
    /// Dropoff zone identifier.
    pub dropoff_zone: String,
}

impl RouteKey {
    /// Creates a key from its two halves.
    #[must_use]
    pub fn new(pickup_zone: impl Into<String>, dropoff_zone: impl Into<String>) -> Self {
        Self {
            pickup_zone: pickup_zone.into(),
            dropoff_zone: dropoff_zone.into(),
        }
    }
}

/// An incoming row from the source row set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Pickup zone identifier.
    pub pickup_zone: String,
    /// Dropoff zone identifier.
    pub dropoff_zone: String,
    /// Aggregated revenue for the route.
    pub route_revenue: f64,
    /// Revenue rank of the route within the batch.
    pub rank: i64,
}

impl SourceRow {
    /// Returns the composite key of this row.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.pickup_zone.clone(), self.dropoff_zone.clone())
    }

    /// Parses a source row from a generic JSON record, validating every
    /// required field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] naming the first field that is missing
    /// or wrongly typed.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            pickup_zone: require_string(record, columns::PICKUP_ZONE)?,
            dropoff_zone: require_string(record, columns::DROPOFF_ZONE)?,
            route_revenue: require_number(record, columns::ROUTE_REVENUE)?,
            rank: require_integer(record, columns::RANK)?,
        })
    }

    /// Renders the row as a generic JSON record.
    #[must_use]
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(
            columns::PICKUP_ZONE.into(),
            Value::String(self.pickup_zone.clone()),
        );
        record.insert(
            columns::DROPOFF_ZONE.into(),
            Value::String(self.dropoff_zone.clone()),
        );
        record.insert(columns::ROUTE_REVENUE.into(), json_number(self.route_revenue));
        record.insert(columns::RANK.into(), Value::from(self.rank));
        record
    }
}

/// A persisted row of the target table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRow {
    /// Pickup zone identifier.
    pub pickup_zone: String,
    /// Dropoff zone identifier.
    pub dropoff_zone: String,
    /// Aggregated revenue for the route.
    pub route_revenue: f64,
    /// Revenue rank of the route within the batch.
    pub rank: i64,
    /// Instant the row was first inserted. Owned by the original insert,
    /// never reassigned.
    pub created_at: DateTime<Utc>,
    /// Instant the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl TargetRow {
    /// Returns the composite key of this row.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.pickup_zone.clone(), self.dropoff_zone.clone())
    }

    /// Builds the row inserted for an unmatched source row: all source
    /// fields copied, both timestamps set to the execution instant.
    #[must_use]
    pub fn inserted_from(source: &SourceRow, now: DateTime<Utc>) -> Self {
        Self {
            pickup_zone: source.pickup_zone.clone(),
            dropoff_zone: source.dropoff_zone.clone(),
            route_revenue: source.route_revenue,
            rank: source.rank,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a matched-row update. `created_at` is untouched because
    /// [`MergeFields`] carries no slot for it.
    pub fn apply(&mut self, update: &MergeFields) {
        self.route_revenue = update.route_revenue;
        self.rank = update.rank;
        self.updated_at = update.updated_at;
    }
}

/// The field set written to a matched target row.
///
/// This is the whole update surface: revenue, rank, and the refreshed
/// update timestamp. The absence of a `created_at` field here is a
/// correctness invariant, not an oversight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeFields {
    /// Revenue taken from the source row.
    pub route_revenue: f64,
    /// Rank taken from the source row.
    pub rank: i64,
    /// The execution instant.
    pub updated_at: DateTime<Utc>,
}

impl MergeFields {
    /// Builds the update field set for a matched source row.
    #[must_use]
    pub fn update_for(source: &SourceRow, now: DateTime<Utc>) -> Self {
        Self {
            route_revenue: source.route_revenue,
            rank: source.rank,
            updated_at: now,
        }
    }
}

/// Renders an instant the way rows store it: RFC 3339 with microsecond
/// precision, UTC.
#[must_use]
pub fn instant_repr(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn require_string(record: &Map<String, Value>, field: &str) -> Result<String> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::schema(format!(
            "field '{field}' must be a string, got {other}"
        ))),
        None => Err(missing(field)),
    }
}

fn require_number(record: &Map<String, Value>, field: &str) -> Result<f64> {
    match record.get(field) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::schema(format!("field '{field}' is not representable as f64"))),
        Some(other) => Err(Error::schema(format!(
            "field '{field}' must be numeric, got {other}"
        ))),
        None => Err(missing(field)),
    }
}

fn require_integer(record: &Map<String, Value>, field: &str) -> Result<i64> {
    match record.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| Error::schema(format!("field '{field}' must be an integer"))),
        Some(other) => Err(Error::schema(format!(
            "field '{field}' must be an integer, got {other}"
        ))),
        None => Err(missing(field)),
    }
}

fn missing(field: &str) -> Error {
    Error::schema(format!("source row missing required field '{field}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_source() -> SourceRow {
        SourceRow {
            pickup_zone: "Z1".into(),
            dropoff_zone: "Z2".into(),
            route_revenue: 100.0,
            rank: 1,
        }
    }

    #[test]
    fn keys_compare_case_sensitively() {
        assert_eq!(RouteKey::new("Z1", "Z2"), RouteKey::new("Z1", "Z2"));
        assert_ne!(RouteKey::new("Z1", "Z2"), RouteKey::new("z1", "Z2"));
        assert_ne!(RouteKey::new("Z1", "Z2"), RouteKey::new("Z2", "Z1"));
    }

    #[test]
    fn insert_sets_both_timestamps_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let row = TargetRow::inserted_from(&sample_source(), now);
        assert_eq!(row.created_at, now);
        assert_eq!(row.updated_at, now);
        assert_eq!(row.key(), RouteKey::new("Z1", "Z2"));
    }

    #[test]
    fn update_leaves_created_at_untouched() {
        let t0 = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 8, 30, 13, 0, 0).unwrap();
        let mut row = TargetRow::inserted_from(&sample_source(), t0);

        let refreshed = SourceRow {
            route_revenue: 150.0,
            rank: 2,
            ..sample_source()
        };
        row.apply(&MergeFields::update_for(&refreshed, t1));

        assert_eq!(row.route_revenue, 150.0);
        assert_eq!(row.rank, 2);
        assert_eq!(row.created_at, t0);
        assert_eq!(row.updated_at, t1);
    }

    #[test]
    fn from_record_round_trips() {
        let record = sample_source().to_record();
        let parsed = SourceRow::from_record(&record).unwrap();
        assert_eq!(parsed, sample_source());
        assert_eq!(parsed.key(), RouteKey::new("Z1", "Z2"));
    }

    #[test]
    fn from_record_names_the_missing_field() {
        let mut record = sample_source().to_record();
        record.remove(columns::RANK);
        let err = SourceRow::from_record(&record).unwrap_err();
        assert!(err.to_string().contains("rank"), "got: {err}");
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn from_record_rejects_wrong_types() {
        let mut record = sample_source().to_record();
        record.insert(columns::ROUTE_REVENUE.into(), Value::String("a lot".into()));
        assert!(matches!(
            SourceRow::from_record(&record),
            Err(Error::Schema { .. })
        ));
    }
}
