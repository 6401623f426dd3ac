//! Column and filter declarations.

use serde::Serialize;
use serde_json::Value as Json;

use crate::{ListQuery, RequestContext, Row, Value};

/// Display hint for a column; rendering is up to the client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Badge,
    Image,
    Boolean,
    Link,
    Date,
    Currency,
}

pub type ValueFn = fn(&Row) -> Value;

/// One list column.
///
/// `key` is the public sort key (`?sort=<key>`); `order_by` lists the record
/// fields the key sorts by. A sortable column without `order_by` sorts by
/// primary key only.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub extra: Json,
    pub sortable: bool,
    pub nowrap: bool,
    pub order_by: Vec<&'static str>,
    pub value: Option<ValueFn>,
}

impl ColumnDef {
    pub fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: ColumnKind::Text,
            extra: Json::Null,
            sortable: true,
            nowrap: false,
            order_by: Vec::new(),
            value: None,
        }
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn extra(mut self, extra: Json) -> Self {
        self.extra = extra;
        self
    }

    pub fn order_by(mut self, fields: &[&'static str]) -> Self {
        self.order_by = fields.to_vec();
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn nowrap(mut self) -> Self {
        self.nowrap = true;
        self
    }

    pub fn value(mut self, f: ValueFn) -> Self {
        self.value = Some(f);
        self
    }

    /// Cell value for `row`: the accessor if declared, else the field named `key`.
    pub fn cell(&self, row: &Row) -> Value {
        match self.value {
            Some(f) => f(row),
            None => row.get(self.key).clone(),
        }
    }

    pub fn meta(&self) -> ColumnMeta {
        ColumnMeta {
            key: self.key,
            label: self.label,
            kind: self.kind,
            extra: self.extra.clone(),
            sortable: self.sortable,
            nowrap: self.nowrap,
        }
    }
}

/// Serializable column description handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub extra: Json,
    pub sortable: bool,
    pub nowrap: bool,
}

pub type ApplyFilterFn = fn(ListQuery, &str, &RequestContext) -> ListQuery;

/// A named server-side filter. Receives the trimmed raw value and the request.
#[derive(Debug, Clone)]
pub struct FilterDef {
    pub name: &'static str,
    pub apply: ApplyFilterFn,
}

impl FilterDef {
    pub fn new(name: &'static str, apply: ApplyFilterFn) -> Self {
        Self { name, apply }
    }
}
