//! `ListQuery` → SQL.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use uuid::Uuid;

use orgdesk_crud::{
    Condition, ListQuery, OrderKey, OrderTarget, RecordSource, Row, RowChunks, SortDirection,
    SourceError, Value,
};

/// First statement of an export transaction.
const SNAPSHOT_TX: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// SQL type of an exposed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgColumn {
    Bool,
    Int,
    Text,
    Uuid,
    Timestamp,
}

impl PgColumn {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Int(_) => Some(Self::Int),
            Value::Text(_) => Some(Self::Text),
            Value::Uuid(_) => Some(Self::Uuid),
            Value::Timestamp(_) => Some(Self::Timestamp),
        }
    }

    fn decode(self, row: &PgRow, name: &str) -> Result<Value, sqlx::Error> {
        Ok(match self {
            Self::Bool => row.try_get::<Option<bool>, _>(name)?.into(),
            Self::Int => row.try_get::<Option<i64>, _>(name)?.into(),
            Self::Text => row.try_get::<Option<String>, _>(name)?.into(),
            Self::Uuid => row.try_get::<Option<Uuid>, _>(name)?.into(),
            Self::Timestamp => row.try_get::<Option<DateTime<Utc>>, _>(name)?.into(),
        })
    }
}

/// A listable table or view: its primary key plus the whitelisted columns a
/// query may filter, search and sort on.
#[derive(Debug, Clone)]
pub struct PgRelation {
    name: &'static str,
    pk: (&'static str, PgColumn),
    columns: Vec<(&'static str, PgColumn)>,
}

impl PgRelation {
    pub fn new(name: &'static str, pk: &'static str, pk_kind: PgColumn) -> Self {
        Self {
            name,
            pk: (pk, pk_kind),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: &'static str, kind: PgColumn) -> Self {
        self.columns.push((name, kind));
        self
    }

    pub fn items() -> Self {
        Self::new("items", "id", PgColumn::Uuid)
            .column("name", PgColumn::Text)
            .column("status", PgColumn::Text)
            .column("created_at", PgColumn::Timestamp)
    }

    pub fn users() -> Self {
        Self::new("users", "id", PgColumn::Uuid)
            .column("username", PgColumn::Text)
            .column("email", PgColumn::Text)
            .column("first_name", PgColumn::Text)
            .column("last_name", PgColumn::Text)
            .column("is_active", PgColumn::Bool)
            .column("is_staff", PgColumn::Bool)
            .column("is_superuser", PgColumn::Bool)
            .column("date_joined", PgColumn::Timestamp)
            .column("last_login", PgColumn::Timestamp)
    }

    /// The `member_rows` view (membership joined with its user).
    pub fn members() -> Self {
        Self::new("member_rows", "id", PgColumn::Uuid)
            .column("organization_id", PgColumn::Uuid)
            .column("user_id", PgColumn::Uuid)
            .column("email", PgColumn::Text)
            .column("username", PgColumn::Text)
            .column("first_name", PgColumn::Text)
            .column("last_name", PgColumn::Text)
            .column("role", PgColumn::Text)
            .column("is_active", PgColumn::Bool)
            .column("created_at", PgColumn::Timestamp)
    }

    fn kind(&self, field: &str) -> Result<PgColumn, SourceError> {
        self.columns
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| SourceError::UnknownField(field.to_string()))
    }

    fn validate(&self, query: &ListQuery) -> Result<(), SourceError> {
        for field in query.referenced_fields() {
            self.kind(field)?;
        }
        Ok(())
    }

    pub(crate) fn count_sql(&self, query: &ListQuery) -> Result<QueryBuilder<'static, Postgres>, SourceError> {
        self.validate(query)?;
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.name));
        self.push_where(&mut qb, query)?;
        Ok(qb)
    }

    /// Every matching row, ordered; no paging.
    pub(crate) fn ordered_select_sql(&self, query: &ListQuery) -> Result<QueryBuilder<'static, Postgres>, SourceError> {
        self.validate(query)?;
        let columns: Vec<&str> = std::iter::once(self.pk.0)
            .chain(self.columns.iter().map(|(name, _)| *name))
            .collect();
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", columns.join(", "), self.name));
        self.push_where(&mut qb, query)?;
        self.push_order(&mut qb, &query.ordering);
        Ok(qb)
    }

    pub(crate) fn select_sql(
        &self,
        query: &ListQuery,
        offset: u64,
        limit: u64,
    ) -> Result<QueryBuilder<'static, Postgres>, SourceError> {
        let mut qb = self.ordered_select_sql(query)?;
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
        Ok(qb)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>, query: &ListQuery) -> Result<(), SourceError> {
        for (i, condition) in query.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            self.push_condition(qb, condition)?;
        }
        Ok(())
    }

    fn push_condition(&self, qb: &mut QueryBuilder<'static, Postgres>, condition: &Condition) -> Result<(), SourceError> {
        let (field, op, value) = match condition {
            Condition::Eq(field, Value::Null) => {
                qb.push(format!("{field} IS NULL"));
                return Ok(());
            }
            Condition::Ne(field, Value::Null) => {
                qb.push(format!("{field} IS NOT NULL"));
                return Ok(());
            }
            Condition::Eq(field, value) => (field, "=", value),
            Condition::Ne(field, value) => (field, "<>", value),
            Condition::Gte(field, value) => (field, ">=", value),
            Condition::Lt(field, value) => (field, "<", value),
            Condition::AnyContains { fields, term } => {
                if fields.is_empty() {
                    qb.push("FALSE");
                    return Ok(());
                }
                let pattern = format!("%{}%", escape_like(term));
                qb.push("(");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(format!("{field}::text ILIKE "));
                    qb.push_bind(pattern.clone());
                    qb.push(" ESCAPE '\\'");
                }
                qb.push(")");
                return Ok(());
            }
        };

        // Comparing across types never matches, as in memory.
        if PgColumn::of(value) != Some(self.kind(field)?) {
            qb.push("FALSE");
            return Ok(());
        }
        qb.push(format!("{field} {op} "));
        push_value(qb, value);
        Ok(())
    }

    fn push_order(&self, qb: &mut QueryBuilder<'static, Postgres>, ordering: &[OrderKey]) {
        let mut keys: Vec<String> = ordering
            .iter()
            .map(|key| {
                let column = match &key.target {
                    OrderTarget::Field(f) => f.as_str(),
                    OrderTarget::PrimaryKey => self.pk.0,
                };
                let direction = match key.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{column} {direction}")
            })
            .collect();
        if !ordering.iter().any(|k| k.target == OrderTarget::PrimaryKey) {
            keys.push(format!("{} ASC", self.pk.0));
        }
        qb.push(" ORDER BY ");
        qb.push(keys.join(", "));
    }

    fn decode(&self, row: &PgRow) -> Result<Row, sqlx::Error> {
        let mut out = Row::new(self.pk.1.decode(row, self.pk.0)?);
        for (name, kind) in &self.columns {
            out.set(*name, kind.decode(row, name)?);
        }
        Ok(out)
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    match value {
        Value::Null => qb.push("NULL"),
        Value::Bool(b) => qb.push_bind(*b),
        Value::Int(i) => qb.push_bind(*i),
        Value::Text(s) => qb.push_bind(s.clone()),
        Value::Uuid(u) => qb.push_bind(*u),
        Value::Timestamp(t) => qb.push_bind(*t),
    };
}

/// Escape `ILIKE` wildcards so the term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn backend(e: sqlx::Error) -> SourceError {
    SourceError::Backend(e.to_string())
}

type ChunkResult = Result<Vec<Row>, SourceError>;

/// Chunks fed by a background task reading one snapshot.
struct SnapshotChunks {
    rx: mpsc::Receiver<ChunkResult>,
}

#[async_trait]
impl RowChunks for SnapshotChunks {
    async fn next_chunk(&mut self) -> Result<Option<Vec<Row>>, SourceError> {
        self.rx.recv().await.transpose()
    }
}

/// Stream the whole query out of a read-only repeatable-read transaction,
/// sending `chunk_size` rows at a time. Stops early once the reader is gone.
async fn stream_snapshot(
    pool: Arc<PgPool>,
    relation: PgRelation,
    query: ListQuery,
    chunk_size: usize,
    out: &mpsc::Sender<ChunkResult>,
) -> Result<(), SourceError> {
    let mut db = pool.begin().await.map_err(backend)?;
    sqlx::query(SNAPSHOT_TX).execute(&mut *db).await.map_err(backend)?;

    let mut qb = relation.ordered_select_sql(&query)?;
    let mut rows = qb.build().fetch(&mut *db);
    let mut chunk = Vec::new();
    while let Some(row) = rows.next().await {
        let row = row.map_err(backend)?;
        chunk.push(relation.decode(&row).map_err(backend)?);
        if chunk.len() >= chunk_size && out.send(Ok(std::mem::take(&mut chunk))).await.is_err() {
            return Ok(());
        }
    }
    if !chunk.is_empty() {
        let _ = out.send(Ok(chunk)).await;
    }
    Ok(())
}

/// A [`RecordSource`] over one [`PgRelation`].
pub struct PgRecordSource {
    pool: Arc<PgPool>,
    relation: PgRelation,
}

impl PgRecordSource {
    pub fn new(pool: Arc<PgPool>, relation: PgRelation) -> Self {
        Self { pool, relation }
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        let mut qb = self.relation.count_sql(query)?;
        let n: i64 = qb
            .build_query_scalar()
            .fetch_one(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
        let mut qb = self.relation.select_sql(query, offset, limit)?;
        let rows = qb.build().fetch_all(&*self.pool).await.map_err(backend)?;
        rows.iter()
            .map(|r| self.relation.decode(r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)
    }

    /// One server-side read for the whole export instead of a query per chunk.
    async fn chunks(&self, query: &ListQuery, chunk_size: u64) -> Result<Box<dyn RowChunks>, SourceError> {
        self.relation.validate(query)?;
        let (out, rx) = mpsc::channel(2);
        let pool = self.pool.clone();
        let relation = self.relation.clone();
        let query = query.clone();
        let chunk_size = usize::try_from(chunk_size.max(1)).unwrap_or(usize::MAX);
        tokio::spawn(async move {
            if let Err(e) = stream_snapshot(pool, relation, query, chunk_size, &out).await {
                tracing::error!(error = %e, "export snapshot failed");
                let _ = out.send(Err(e)).await;
            }
        });
        Ok(Box::new(SnapshotChunks { rx }))
    }
}
