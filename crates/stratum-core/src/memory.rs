//! In-memory catalog backend for testing.
//!
//! Thread-safe via `RwLock`. Not suitable for production. Branches carry a
//! numeric generation token to simulate the CAS behavior of a real
//! versioned store: a handle resolved before a concurrent commit fails
//! with a conflict, and every merge is applied all-or-nothing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::catalog::{CatalogBackend, ReferenceHandle};
use crate::error::{Error, ExecutionFailure, Result};
use crate::ident::{RefName, SourceName, TableName};
use crate::merge_spec::{MergeSpec, MergeValue};
use crate::row::instant_repr;

type Record = Map<String, Value>;

#[derive(Debug, Default)]
struct Branch {
    generation: u64,
    tables: HashMap<String, Vec<Record>>,
}

#[derive(Debug, Default)]
struct State {
    branches: HashMap<String, Branch>,
    views: HashMap<String, Vec<Record>>,
}

/// In-memory implementation of [`CatalogBackend`].
#[derive(Debug)]
pub struct MemoryCatalog {
    state: RwLock<State>,
    closed: AtomicBool,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    /// Creates a catalog with a single empty `main` branch.
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        state.branches.insert("main".to_string(), Branch::default());
        Self {
            state: RwLock::new(state),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates an additional empty branch.
    pub fn create_branch(&self, name: &RefName) {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .branches
            .entry(name.as_str().to_string())
            .or_default();
    }

    /// Registers a named source row set.
    pub fn register_view(&self, name: &SourceName, rows: Vec<Record>) {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.views.insert(name.as_str().to_string(), rows);
    }

    /// Seeds a target table on a branch with pre-existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reference`] if the branch does not exist.
    pub fn seed_table(&self, branch: &RefName, table: &TableName, rows: Vec<Record>) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let branch = state
            .branches
            .get_mut(branch.as_str())
            .ok_or_else(|| Error::reference(branch.as_str(), "reference not found"))?;
        branch.tables.insert(table.as_str().to_string(), rows);
        Ok(())
    }

    /// Returns the rows of a table on a branch, deterministically ordered.
    ///
    /// An absent table reads as empty, matching object-store semantics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reference`] if the branch does not exist.
    pub fn table_rows(&self, branch: &RefName, table: &TableName) -> Result<Vec<Record>> {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let branch = state
            .branches
            .get(branch.as_str())
            .ok_or_else(|| Error::reference(branch.as_str(), "reference not found"))?;
        let mut rows = branch
            .tables
            .get(table.as_str())
            .cloned()
            .unwrap_or_default();
        rows.sort_by_key(|r| serde_json::to_string(r).unwrap_or_default());
        Ok(rows)
    }

    /// Whether [`CatalogBackend::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::execution(
                ExecutionFailure::Connectivity,
                "catalog session is closed",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogBackend for MemoryCatalog {
    async fn resolve_reference(&self, name: &RefName) -> Result<ReferenceHandle> {
        self.ensure_open()?;
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let branch = state
            .branches
            .get(name.as_str())
            .ok_or_else(|| Error::reference(name.as_str(), "reference not found"))?;
        Ok(ReferenceHandle::new(
            name.clone(),
            branch.generation.to_string(),
        ))
    }

    async fn merge_into(
        &self,
        reference: &ReferenceHandle,
        target: &TableName,
        source: &SourceName,
        spec: &MergeSpec,
    ) -> Result<()> {
        self.ensure_open()?;
        spec.validate()?;

        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);

        let source_rows = state
            .views
            .get(source.as_str())
            .cloned()
            .ok_or_else(|| {
                Error::execution(
                    ExecutionFailure::Constraint,
                    format!("source row set '{source}' is not registered"),
                )
            })?;

        let branch = state
            .branches
            .get_mut(reference.name().as_str())
            .ok_or_else(|| Error::reference(reference.name().as_str(), "reference not found"))?;

        if reference.token() != branch.generation.to_string() {
            return Err(Error::execution(
                ExecutionFailure::Conflict,
                format!(
                    "reference '{}' moved since resolution (expected generation {}, found {})",
                    reference.name(),
                    reference.token(),
                    branch.generation
                ),
            ));
        }

        let current = branch
            .tables
            .get(target.as_str())
            .cloned()
            .unwrap_or_default();

        // Compute the post-merge table fully before publishing anything,
        // so a failure part-way through leaves the branch untouched.
        let next = apply_merge(&current, &source_rows, spec)?;

        branch.tables.insert(target.as_str().to_string(), next);
        branch.generation += 1;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Applies one merge specification to a table snapshot, returning the new
/// row set. Pure; the caller publishes the result atomically.
fn apply_merge(current: &[Record], source_rows: &[Record], spec: &MergeSpec) -> Result<Vec<Record>> {
    let mut next: Vec<Record> = current.to_vec();

    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    for (i, row) in next.iter().enumerate() {
        let key = record_key(row, &spec.match_columns, "target")?;
        if index.insert(key, i).is_some() {
            return Err(Error::data_integrity(format!(
                "target table holds duplicate rows for one composite key on {:?}",
                spec.match_columns
            )));
        }
    }

    let mut batch_keys: HashSet<Vec<String>> = HashSet::new();
    for record in source_rows {
        let key = record_key(record, &spec.match_columns, "source")?;
        if !batch_keys.insert(key.clone()) {
            return Err(Error::data_integrity(format!(
                "source batch holds duplicate rows for one composite key on {:?}",
                spec.match_columns
            )));
        }

        if let Some(&i) = index.get(&key) {
            for assignment in &spec.when_matched {
                let value = eval_value(&assignment.value, record)?;
                next[i].insert(assignment.column.clone(), value);
            }
        } else {
            let mut inserted = Record::new();
            for assignment in &spec.when_not_matched {
                let value = eval_value(&assignment.value, record)?;
                inserted.insert(assignment.column.clone(), value);
            }
            next.push(inserted);
            index.insert(key, next.len() - 1);
        }
    }

    Ok(next)
}

fn eval_value(value: &MergeValue, record: &Record) -> Result<Value> {
    match value {
        MergeValue::SourceColumn { column } => record.get(column).cloned().ok_or_else(|| {
            Error::schema(format!("source row missing required field '{column}'"))
        }),
        MergeValue::Instant { at } => Ok(Value::String(instant_repr(*at))),
    }
}

/// Extracts the canonical key tuple of a record. Key columns must be
/// strings or integers.
fn record_key(record: &Record, columns: &[String], side: &str) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|column| match record.get(column) {
            Some(Value::String(s)) => Ok(format!("s:{s}")),
            Some(Value::Number(n)) => n.as_i64().map(|v| format!("i:{v}")).ok_or_else(|| {
                Error::schema(format!("{side} key column '{column}' must be an integer"))
            }),
            Some(other) => Err(Error::schema(format!(
                "{side} key column '{column}' has unsupported type: {other}"
            ))),
            None => Err(Error::schema(format!(
                "{side} row missing key column '{column}'"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::columns;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(pickup: &str, dropoff: &str, revenue: f64, rank: i64) -> Record {
        let Value::Object(map) = json!({
            columns::PICKUP_ZONE: pickup,
            columns::DROPOFF_ZONE: dropoff,
            columns::ROUTE_REVENUE: revenue,
            columns::RANK: rank,
        }) else {
            unreachable!()
        };
        map
    }

    fn upsert_spec() -> MergeSpec {
        use crate::merge_spec::MergeAssignment;
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        MergeSpec {
            match_columns: vec![columns::PICKUP_ZONE.into(), columns::DROPOFF_ZONE.into()],
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

    #[tokio::test]
    async fn resolve_unknown_reference_fails() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .resolve_reference(&RefName::new("audit").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reference { .. }));
    }

    #[tokio::test]
    async fn merge_rejects_stale_handle() {
        let catalog = MemoryCatalog::new();
        let main = RefName::main();
        let table: TableName = "gold_top_routes".parse().unwrap();
        let source: SourceName = "tmp_routes".parse().unwrap();
        catalog.register_view(&source, vec![record("Z1", "Z2", 100.0, 1)]);

        let stale = catalog.resolve_reference(&main).await.unwrap();
        catalog
            .merge_into(&stale, &table, &source, &upsert_spec())
            .await
            .unwrap();

        // Generation advanced; the old handle now conflicts.
        let err = catalog
            .merge_into(&stale, &table, &source, &upsert_spec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Execution {
                kind: ExecutionFailure::Conflict,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn duplicate_batch_keys_are_an_integrity_error() {
        let catalog = MemoryCatalog::new();
        let main = RefName::main();
        let table: TableName = "gold_top_routes".parse().unwrap();
        let source: SourceName = "tmp_routes".parse().unwrap();
        catalog.register_view(
            &source,
            vec![record("Z1", "Z2", 100.0, 1), record("Z1", "Z2", 90.0, 2)],
        );

        let handle = catalog.resolve_reference(&main).await.unwrap();
        let err = catalog
            .merge_into(&handle, &table, &source, &upsert_spec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
        assert!(catalog.table_rows(&main, &table).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregistered_source_is_a_constraint_failure() {
        let catalog = MemoryCatalog::new();
        let handle = catalog.resolve_reference(&RefName::main()).await.unwrap();
        let err = catalog
            .merge_into(
                &handle,
                &"gold_top_routes".parse().unwrap(),
                &"missing_view".parse().unwrap(),
                &upsert_spec(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Execution {
                kind: ExecutionFailure::Constraint,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn closed_catalog_rejects_operations() {
        let catalog = MemoryCatalog::new();
        catalog.close().await.unwrap();
        assert!(catalog.is_closed());
        let err = catalog
            .resolve_reference(&RefName::main())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        // close is idempotent
        catalog.close().await.unwrap();
    }
}
