use crate::domain::ports::TableBackend;
use crate::domain::query::{Filter, IsValue, Query, Row};
use crate::utils::error::{CrmError, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

/// In-process table store evaluating the same [`Query`] model the HTTP
/// backend sends over the wire.
///
/// Inserted rows get a numeric `id` plus `created_at`/`updated_at` when they
/// lack them, and updates refresh `updated_at`, the way the hosted tables'
/// column defaults and triggers do.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    failing: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `table` fail with a remote error until cleared.
    pub fn set_failing(&self, table: &str, failing: bool) {
        if let Ok(mut set) = self.failing.lock() {
            if failing {
                set.insert(table.to_string());
            } else {
                set.remove(table);
            }
        }
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn guard(&self, table: &str) -> Result<MutexGuard<'_, HashMap<String, Vec<Row>>>> {
        let failing = self
            .failing
            .lock()
            .map(|set| set.contains(table))
            .unwrap_or(false);
        if failing {
            return Err(CrmError::Remote {
                code: Some("08006".to_string()),
                message: format!("table '{}' is unavailable", table),
                details: None,
                hint: None,
            });
        }
        self.tables
            .lock()
            .map_err(|_| CrmError::remote("in-memory table lock poisoned"))
    }

    fn now() -> Value {
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    fn stamp_new(&self, mut row: Row) -> Row {
        if !row.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            row.insert("id".to_string(), Value::from(id));
        }
        let now = Self::now();
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);
        row
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_match(value: Option<&Value>, expected: IsValue) -> bool {
    match expected {
        IsValue::Null => matches!(value, None | Some(Value::Null)),
        IsValue::True => matches!(value, Some(Value::Bool(true))),
        IsValue::False => matches!(value, Some(Value::Bool(false))),
    }
}

pub(crate) fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let value = row.get(filter.column());
    match filter {
        Filter::Eq(_, expected) => value.and_then(as_text).as_deref() == Some(expected.as_str()),
        Filter::Neq(_, expected) => value
            .and_then(as_text)
            .is_some_and(|actual| actual != *expected),
        Filter::Is(_, expected) => is_match(value, *expected),
        Filter::NotIs(_, expected) => !is_match(value, *expected),
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_filter(row, f))
}

/// Nulls sort as the largest value, so they land last ascending and first
/// descending, like Postgres.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
    }
}

fn project(row: &Row, columns: &str) -> Row {
    if columns.trim() == "*" {
        return row.clone();
    }
    columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

fn evaluate(rows: &[Row], query: &Query) -> Vec<Row> {
    let mut selected: Vec<&Row> = rows
        .iter()
        .filter(|row| matches_all(row, &query.filters))
        .collect();

    if !query.order.is_empty() {
        selected.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|o| {
                    let ord = compare_values(a.get(&o.column), b.get(&o.column));
                    if o.ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    selected
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|row| project(row, &query.columns))
        .collect()
}

#[async_trait]
impl TableBackend for InMemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let tables = self.guard(&query.table)?;
        let rows = tables.get(&query.table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(evaluate(rows, query))
    }

    async fn select_single(&self, query: &Query) -> Result<Row> {
        let mut rows = self.select(query).await?;
        if rows.len() != 1 {
            return Err(CrmError::Remote {
                code: Some("PGRST116".to_string()),
                message: "JSON object requested, multiple (or no) rows returned".to_string(),
                details: Some(format!("The result contains {} rows", rows.len())),
                hint: None,
            });
        }
        Ok(rows.remove(0))
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tables = self.guard(table)?;
        let stamped: Vec<Row> = rows.into_iter().map(|row| self.stamp_new(row)).collect();
        tables
            .entry(table.to_string())
            .or_default()
            .extend(stamped.iter().cloned());
        Ok(stamped)
    }

    async fn insert_many(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        self.insert(table, rows).await.map(|_| ())
    }

    async fn update(&self, query: &Query, changes: Row) -> Result<()> {
        let mut tables = self.guard(&query.table)?;
        if let Some(rows) = tables.get_mut(&query.table) {
            let now = Self::now();
            for row in rows.iter_mut().filter(|row| matches_all(row, &query.filters)) {
                for (column, value) in &changes {
                    row.insert(column.clone(), value.clone());
                }
                if !changes.contains_key("updated_at") {
                    row.insert("updated_at".to_string(), now.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, query: &Query) -> Result<()> {
        let mut tables = self.guard(&query.table)?;
        if let Some(rows) = tables.get_mut(&query.table) {
            rows.retain(|row| !matches_all(row, &query.filters));
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>, on_conflict: &str) -> Result<()> {
        let mut tables = self.guard(table)?;
        for incoming in rows {
            let key = incoming.get(on_conflict).cloned();
            let existing = tables.entry(table.to_string()).or_default();
            match existing
                .iter_mut()
                .find(|row| key.is_some() && row.get(on_conflict) == key.as_ref())
            {
                Some(row) => {
                    for (column, value) in incoming {
                        row.insert(column, value);
                    }
                }
                None => existing.push(self.stamp_new(incoming)),
            }
        }
        Ok(())
    }
}
