//! The `catalog.items` listing.

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;

use orgdesk_crud::{
    ColumnDef, ColumnKind, ConfigError, CrudConfig, ExportFormat, FilterDef, ListQuery,
    RequestContext, Row, RowUrls, Value,
};

use crate::ItemStatus;

pub const ITEMS_SLUG: &str = "catalog.items";

fn status_filter(query: ListQuery, raw: &str, _: &RequestContext) -> ListQuery {
    match ItemStatus::parse(raw) {
        Some(status) => query.eq("status", status.as_str()),
        None => query,
    }
}

/// Midnight UTC of a `YYYY-MM-DD` date; anything else is ignored.
fn day_start(raw: &str) -> Option<Value> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    Some(Value::Timestamp(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))))
}

fn created_from(query: ListQuery, raw: &str, _: &RequestContext) -> ListQuery {
    match day_start(raw) {
        Some(v) => query.gte("created_at", v),
        None => query,
    }
}

/// Inclusive of the whole `to` day.
fn created_to(query: ListQuery, raw: &str, _: &RequestContext) -> ListQuery {
    let next = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .and_then(|d| day_start(&d.format("%Y-%m-%d").to_string()));
    match next {
        Some(v) => query.lt("created_at", v),
        None => query,
    }
}

fn item_urls(row: &Row) -> RowUrls {
    let url = format!("/items/{}", row.pk().to_text());
    RowUrls {
        detail: None,
        edit: Some(url.clone()),
        delete: Some(url),
    }
}

pub fn items_config() -> Result<CrudConfig, ConfigError> {
    CrudConfig::builder(ITEMS_SLUG)
        .labels("Item", "Items")
        .status_option("active", "Active")
        .status_option("inactive", "Inactive")
        .column(ColumnDef::new("name", "Name").order_by(&["name"]))
        .column(
            ColumnDef::new("status", "Status")
                .kind(ColumnKind::Badge)
                .extra(json!({"active": "success", "inactive": "secondary"}))
                .order_by(&["status"]),
        )
        .column(
            ColumnDef::new("created_at", "Created")
                .kind(ColumnKind::Date)
                .order_by(&["created_at"])
                .nowrap(),
        )
        .search(&["name"])
        .filter(FilterDef::new("status", status_filter))
        .filter(FilterDef::new("from", created_from))
        .filter(FilterDef::new("to", created_to))
        .default_sort("created_at")
        .page_size(10)
        .permissions("items.view", "items.add", "items.change", "items.delete")
        .export_fields(&[("name", "Name"), ("status", "Status"), ("created_at", "Created")])
        .export_formats(&ExportFormat::ALL)
        .export_names("items", "Items", "Items")
        .row_urls(item_urls)
        .build()
}
