//! Generic record model the engine works on.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use orgdesk_core::{ItemId, MembershipId, OrganizationId, UserId};

/// A single field value.
///
/// Ordering: values of the same variant compare naturally; `Null` sorts after
/// everything else so an ascending sort puts nulls last (as Postgres does).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text Postgres produces for `value::text` with the session time
    /// zone set to UTC, which is what search terms are matched against.
    pub fn search_text(&self) -> String {
        match self {
            Value::Timestamp(t) => {
                let micros = t.timestamp_subsec_micros();
                let fraction = if micros == 0 {
                    String::new()
                } else {
                    format!(".{micros:06}").trim_end_matches('0').to_string()
                };
                format!("{}{}+00", t.format("%Y-%m-%d %H:%M:%S"), fraction)
            }
            other => other.to_text(),
        }
    }

    /// Plain-text rendering for row URLs and exports.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Text(s) => s.clone(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(t) => t.to_rfc3339(),
        }
    }

    /// Compare two values of the same variant; `None` when the variants differ
    /// or either side is null (SQL comparison semantics).
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Text(_) => 2,
            Value::Uuid(_) => 3,
            Value::Timestamp(_) => 4,
            Value::Null => 5,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_compare(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

macro_rules! impl_value_from_id {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Uuid(*v.as_uuid())
                }
            }
        )*
    };
}

impl_value_from_id!(OrganizationId, UserId, MembershipId, ItemId);

static NULL: Value = Value::Null;

/// A record as the engine sees it: a primary key plus named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pk: Value,
    fields: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(pk: impl Into<Value>) -> Self {
        Self {
            pk: pk.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn pk(&self) -> &Value {
        &self.pk
    }

    /// Field lookup; unknown keys read as `Null`.
    pub fn get(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL)
    }

    pub fn text(&self, key: &str) -> &str {
        self.get(key).as_str().unwrap_or_default()
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).as_bool().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_search_as_postgres_prints_them() {
        use chrono::TimeZone;
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(Value::from(whole).search_text(), "2024-05-01 12:00:00+00");

        let fractional = whole + chrono::Duration::microseconds(120_000);
        assert_eq!(Value::from(fractional).search_text(), "2024-05-01 12:00:00.12+00");
        assert_eq!(Value::from(true).search_text(), "true");
    }

    #[test]
    fn null_sorts_last() {
        let mut values = vec![Value::Null, Value::from("b"), Value::from("a")];
        values.sort();
        assert_eq!(values, vec![Value::from("a"), Value::from("b"), Value::Null]);
    }

    #[test]
    fn mixed_variants_are_not_comparable_for_filters() {
        assert_eq!(Value::from(1i64).partial_compare(&Value::from("1")), None);
        assert_eq!(Value::Null.partial_compare(&Value::Null), None);
    }

    #[test]
    fn missing_field_reads_as_null() {
        let row = Row::new(1i64).with("name", "Widget");
        assert_eq!(row.text("name"), "Widget");
        assert!(row.get("missing").is_null());
        assert!(!row.flag("missing"));
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_value(vec![Value::Null, Value::from(true), Value::from("x")]).unwrap();
        assert_eq!(json, serde_json::json!([null, true, "x"]));
    }
}
