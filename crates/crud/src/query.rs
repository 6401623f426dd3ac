//! Backend-neutral list query.

use serde::{Deserialize, Serialize};

use crate::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive parse of `asc` / `desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTarget {
    Field(String),
    PrimaryKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub target: OrderTarget,
    pub direction: SortDirection,
}

impl OrderKey {
    pub fn field(name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            target: OrderTarget::Field(name.into()),
            direction,
        }
    }

    pub fn pk(direction: SortDirection) -> Self {
        Self {
            target: OrderTarget::PrimaryKey,
            direction,
        }
    }
}

/// A row predicate. All conditions of a query are AND-combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `field = value` (`IS NULL` when value is null).
    Eq(String, Value),
    /// `field <> value` (`IS NOT NULL` when value is null).
    Ne(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    /// Case-insensitive substring match on any of `fields`.
    AnyContains { fields: Vec<String>, term: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub conditions: Vec<Condition>,
    pub ordering: Vec<OrderKey>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Condition::Eq(field.into(), value.into()))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Condition::Ne(field.into(), value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Condition::Gte(field.into(), value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Condition::Lt(field.into(), value.into()))
    }

    /// Replace any existing ordering.
    pub fn order_by(mut self, keys: Vec<OrderKey>) -> Self {
        self.ordering = keys;
        self
    }

    /// Every field name the query references (for backend whitelisting).
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for c in &self.conditions {
            match c {
                Condition::Eq(f, _) | Condition::Ne(f, _) | Condition::Gte(f, _) | Condition::Lt(f, _) => {
                    out.push(f.as_str())
                }
                Condition::AnyContains { fields, .. } => out.extend(fields.iter().map(String::as_str)),
            }
        }
        for key in &self.ordering {
            if let OrderTarget::Field(f) = &key.target {
                out.push(f.as_str());
            }
        }
        out
    }
}
