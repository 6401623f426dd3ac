//! In-process evaluation of a [`ListQuery`] over a row set.
//!
//! Filtering and search match the SQL translation: comparisons against null
//! or a value of another type never match, and search is case-insensitive
//! over [`Value::search_text`]. Nulls sort last ascending and first
//! descending. Text sorts by code point here, whereas Postgres uses the
//! database collation.

use std::cmp::Ordering;

use crate::{Condition, ListQuery, OrderKey, OrderTarget, RecordSource, Row, SortDirection, SourceError, Value};

pub fn matches(row: &Row, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(field, Value::Null) => row.get(field).is_null(),
        Condition::Ne(field, Value::Null) => !row.get(field).is_null(),
        Condition::Eq(field, value) => row.get(field).partial_compare(value) == Some(Ordering::Equal),
        Condition::Ne(field, value) => matches!(
            row.get(field).partial_compare(value),
            Some(Ordering::Less | Ordering::Greater)
        ),
        Condition::Gte(field, value) => matches!(
            row.get(field).partial_compare(value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Condition::Lt(field, value) => row.get(field).partial_compare(value) == Some(Ordering::Less),
        Condition::AnyContains { fields, term } => {
            let needle = term.to_lowercase();
            fields.iter().any(|f| {
                let v = row.get(f);
                !v.is_null() && v.search_text().to_lowercase().contains(&needle)
            })
        }
    }
}

fn key_value<'a>(row: &'a Row, key: &OrderKey) -> &'a Value {
    match &key.target {
        OrderTarget::Field(f) => row.get(f),
        OrderTarget::PrimaryKey => row.pk(),
    }
}

pub fn compare(a: &Row, b: &Row, ordering: &[OrderKey]) -> Ordering {
    for key in ordering {
        let ord = key_value(a, key).cmp(key_value(b, key));
        let ord = match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Filter and sort `rows` (stable sort).
pub fn evaluate(rows: impl IntoIterator<Item = Row>, query: &ListQuery) -> Vec<Row> {
    let mut out: Vec<Row> = rows
        .into_iter()
        .filter(|row| query.conditions.iter().all(|c| matches(row, c)))
        .collect();
    out.sort_by(|a, b| compare(a, b, &query.ordering));
    out
}

/// A [`RecordSource`] over a fixed snapshot of rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<Row>,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

#[async_trait::async_trait]
impl RecordSource for MemorySource {
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        let n = self
            .rows
            .iter()
            .filter(|row| query.conditions.iter().all(|c| matches(row, c)))
            .count();
        Ok(n as u64)
    }

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
        Ok(evaluate(self.rows.iter().cloned(), query)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
