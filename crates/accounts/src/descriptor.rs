//! The `admin.users` listing.

use serde_json::json;

use orgdesk_crud::{
    ColumnDef, ColumnKind, ConfigError, CrudConfig, ExportFormat, FilterDef, ListQuery,
    RequestContext, Row, RowUrls, SortDirection, Value,
};

pub const USERS_SLUG: &str = "admin.users";

fn full_name(row: &Row) -> Value {
    let name = format!("{} {}", row.text("first_name"), row.text("last_name"));
    let name = name.trim();
    Value::from(if name.is_empty() { "-" } else { name })
}

fn role_label(row: &Row) -> Value {
    let label = if row.flag("is_superuser") {
        "Superuser"
    } else if row.flag("is_staff") {
        "Staff"
    } else {
        "User"
    };
    Value::from(label)
}

fn last_login(row: &Row) -> Value {
    match row.get("last_login") {
        Value::Null => Value::from("Never"),
        other => other.clone(),
    }
}

fn status_filter(query: ListQuery, raw: &str, _: &RequestContext) -> ListQuery {
    match raw {
        "active" => query.eq("is_active", true),
        "inactive" => query.eq("is_active", false),
        _ => query,
    }
}

fn role_filter(query: ListQuery, raw: &str, _: &RequestContext) -> ListQuery {
    match raw {
        "superuser" => query.eq("is_superuser", true),
        "staff" => query.eq("is_staff", true).eq("is_superuser", false),
        "regular" => query.eq("is_staff", false).eq("is_superuser", false),
        _ => query,
    }
}

fn user_urls(row: &Row) -> RowUrls {
    RowUrls {
        detail: None,
        edit: Some(format!("/users/{}/toggle", row.pk().to_text())),
        delete: None,
    }
}

pub fn users_config() -> Result<CrudConfig, ConfigError> {
    CrudConfig::builder(USERS_SLUG)
        .labels("User", "Users")
        .status_option("active", "Active")
        .status_option("inactive", "Inactive")
        .column(ColumnDef::new("username", "Username").order_by(&["username"]))
        .column(
            ColumnDef::new("full_name", "Name")
                .order_by(&["first_name", "last_name"])
                .value(full_name),
        )
        .column(ColumnDef::new("email", "E-mail").order_by(&["email"]))
        .column(
            ColumnDef::new("role", "Role")
                .kind(ColumnKind::Badge)
                .extra(json!({"Superuser": "danger", "Staff": "warning", "User": "secondary"}))
                .order_by(&["is_superuser", "is_staff"])
                .value(role_label),
        )
        .column(
            ColumnDef::new("is_active", "Active")
                .kind(ColumnKind::Boolean)
                .order_by(&["is_active"]),
        )
        .column(
            ColumnDef::new("date_joined", "Joined")
                .kind(ColumnKind::Date)
                .order_by(&["date_joined"])
                .nowrap(),
        )
        .column(
            ColumnDef::new("last_login", "Last login")
                .kind(ColumnKind::Date)
                .order_by(&["last_login"])
                .value(last_login)
                .nowrap(),
        )
        .search(&["username", "email", "first_name", "last_name"])
        .filter(FilterDef::new("status", status_filter))
        .filter(FilterDef::new("role", role_filter))
        .default_sort("date_joined")
        .page_size(20)
        .permissions("users.view", "users.add", "users.change", "users.change")
        .export_fields(&[
            ("username", "Username"),
            ("email", "E-mail"),
            ("first_name", "First name"),
            ("last_name", "Last name"),
            ("is_active", "Active"),
            ("is_staff", "Staff"),
            ("is_superuser", "Superuser"),
            ("date_joined", "Joined"),
            ("last_login", "Last login"),
        ])
        .export_formats(&ExportFormat::ALL)
        .export_names("users", "Users", "Users")
        .row_urls(user_urls)
        .build()
}
