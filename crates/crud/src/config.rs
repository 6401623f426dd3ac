//! The listing descriptor.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::params::FIXED_KEYS;
use crate::{
    ColumnDef, CrudParams, ExportFormat, FilterDef, ListQuery, PermissionSpec, RequestContext, Row,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Per-row action links. `None` hides the action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowUrls {
    pub detail: Option<String>,
    pub edit: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CrudPermissions {
    pub list: PermissionSpec,
    pub create: PermissionSpec,
    pub edit: PermissionSpec,
    pub delete: PermissionSpec,
}

/// Modal/form titles. `edit`/`delete` may contain `{pk}`.
#[derive(Debug, Clone, Serialize)]
pub struct FormTitles {
    pub create: String,
    pub edit: String,
    pub delete: String,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub enabled: bool,
    pub fields: Vec<&'static str>,
    pub headers: BTreeMap<&'static str, &'static str>,
    pub formats: BTreeSet<ExportFormat>,
    pub filename_base: String,
    pub sheet_name: String,
    pub title: String,
}

impl ExportConfig {
    /// Header for `field`, falling back to the field name.
    pub fn header_for(&self, field: &str) -> String {
        self.headers
            .get(field)
            .map(|h| h.to_string())
            .unwrap_or_else(|| field.to_string())
    }

    pub fn headers_in_order(&self) -> Vec<String> {
        self.fields.iter().map(|f| self.header_for(f)).collect()
    }

    pub fn allows(&self, format: ExportFormat) -> bool {
        self.formats.contains(&format)
    }
}

pub type BaseScopeFn = fn(&RequestContext) -> ListQuery;
pub type RowUrlsFn = fn(&Row) -> RowUrls;

fn unscoped(_: &RequestContext) -> ListQuery {
    ListQuery::new()
}

fn no_urls(_: &Row) -> RowUrls {
    RowUrls::default()
}

/// Immutable description of one listing.
///
/// Built once at start-up with [`CrudConfig::builder`] and shared behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct CrudConfig {
    pub slug: String,
    pub page_title: String,
    pub entity_label: String,
    pub entity_label_plural: String,
    pub status_options: Vec<StatusOption>,
    pub columns: Vec<ColumnDef>,
    pub filters: Vec<FilterDef>,
    pub search_fields: Vec<&'static str>,
    pub default_sort_key: &'static str,
    pub page_size: u64,
    pub permissions: CrudPermissions,
    pub titles: FormTitles,
    pub export: ExportConfig,
    pub base_scope: BaseScopeFn,
    pub row_urls: RowUrlsFn,
}

impl CrudConfig {
    pub fn builder(slug: impl Into<String>) -> CrudConfigBuilder {
        CrudConfigBuilder::new(slug.into())
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Normalise raw query pairs against this listing's declared filters.
    pub fn parse_params<'a, I>(&self, raw: I) -> CrudParams
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let extra: Vec<&str> = self
            .filters
            .iter()
            .map(|f| f.name)
            .filter(|name| !FIXED_KEYS.contains(name))
            .collect();
        CrudParams::parse(raw, &extra)
    }

    pub fn can_list(&self, ctx: &RequestContext) -> bool {
        self.permissions.list.allows(ctx)
    }

    pub fn can_create(&self, ctx: &RequestContext) -> bool {
        self.permissions.create.allows(ctx)
    }

    pub fn can_edit(&self, ctx: &RequestContext) -> bool {
        self.permissions.edit.allows(ctx)
    }

    pub fn can_delete(&self, ctx: &RequestContext) -> bool {
        self.permissions.delete.allows(ctx)
    }

    /// Export follows the list permission.
    pub fn can_export(&self, ctx: &RequestContext) -> bool {
        self.can_list(ctx)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("listing slug must not be empty")]
    EmptySlug,

    #[error("page size must be at least 1")]
    ZeroPageSize,
}

pub struct CrudConfigBuilder {
    config: CrudConfig,
}

impl CrudConfigBuilder {
    fn new(slug: String) -> Self {
        let base = slug.replace('.', "_");
        Self {
            config: CrudConfig {
                slug: slug.trim().to_string(),
                page_title: String::new(),
                entity_label: "Item".to_string(),
                entity_label_plural: "Items".to_string(),
                status_options: Vec::new(),
                columns: Vec::new(),
                filters: Vec::new(),
                search_fields: Vec::new(),
                default_sort_key: "pk",
                page_size: 20,
                permissions: CrudPermissions::default(),
                titles: FormTitles {
                    create: "New Item".to_string(),
                    edit: "Edit #{pk}".to_string(),
                    delete: "Delete #{pk}".to_string(),
                },
                export: ExportConfig {
                    enabled: false,
                    fields: Vec::new(),
                    headers: BTreeMap::new(),
                    formats: ExportFormat::ALL.into_iter().collect(),
                    filename_base: base,
                    sheet_name: "Export".to_string(),
                    title: String::new(),
                },
                base_scope: unscoped,
                row_urls: no_urls,
            },
        }
    }

    pub fn page_title(mut self, title: impl Into<String>) -> Self {
        self.config.page_title = title.into();
        self
    }

    /// Singular and plural entity labels; also seeds the form titles.
    pub fn labels(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.config.entity_label = singular.into();
        self.config.entity_label_plural = plural.into();
        self.config.titles = FormTitles {
            create: format!("New {}", self.config.entity_label),
            edit: format!("Edit {} #{{pk}}", self.config.entity_label),
            delete: format!("Delete {} #{{pk}}", self.config.entity_label),
        };
        self
    }

    pub fn status_option(mut self, value: &'static str, label: &'static str) -> Self {
        self.config.status_options.push(StatusOption { value, label });
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.config.columns.push(column);
        self
    }

    pub fn filter(mut self, filter: FilterDef) -> Self {
        self.config.filters.push(filter);
        self
    }

    pub fn search(mut self, fields: &[&'static str]) -> Self {
        self.config.search_fields = fields.to_vec();
        self
    }

    /// Column key used when the request names none.
    pub fn default_sort(mut self, key: &'static str) -> Self {
        self.config.default_sort_key = key;
        self
    }

    pub fn page_size(mut self, size: u64) -> Self {
        self.config.page_size = size;
        self
    }

    /// Textual permission specs for list/create/edit/delete.
    pub fn permissions(mut self, list: &str, create: &str, edit: &str, delete: &str) -> Self {
        self.config.permissions = CrudPermissions {
            list: PermissionSpec::parse(list),
            create: PermissionSpec::parse(create),
            edit: PermissionSpec::parse(edit),
            delete: PermissionSpec::parse(delete),
        };
        self
    }

    pub fn export_fields(mut self, fields: &[(&'static str, &'static str)]) -> Self {
        self.config.export.enabled = true;
        self.config.export.fields = fields.iter().map(|(f, _)| *f).collect();
        self.config.export.headers = fields.iter().copied().collect();
        self
    }

    pub fn export_formats(mut self, formats: &[ExportFormat]) -> Self {
        self.config.export.formats = formats.iter().copied().collect();
        self
    }

    pub fn export_names(
        mut self,
        filename_base: impl Into<String>,
        sheet_name: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.config.export.filename_base = filename_base.into();
        self.config.export.sheet_name = sheet_name.into();
        self.config.export.title = title.into();
        self
    }

    pub fn disable_export(mut self) -> Self {
        self.config.export.enabled = false;
        self
    }

    pub fn base_scope(mut self, f: BaseScopeFn) -> Self {
        self.config.base_scope = f;
        self
    }

    pub fn row_urls(mut self, f: RowUrlsFn) -> Self {
        self.config.row_urls = f;
        self
    }

    pub fn build(mut self) -> Result<CrudConfig, ConfigError> {
        if self.config.slug.is_empty() {
            return Err(ConfigError::EmptySlug);
        }
        if self.config.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.config.page_title.is_empty() {
            self.config.page_title = self.config.entity_label_plural.clone();
        }
        if self.config.export.title.is_empty() {
            self.config.export.title = self.config.page_title.clone();
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnDef;

    #[test]
    fn build_rejects_empty_slug_and_zero_page_size() {
        assert_eq!(CrudConfig::builder("  ").build().unwrap_err(), ConfigError::EmptySlug);
        assert_eq!(
            CrudConfig::builder("x").page_size(0).build().unwrap_err(),
            ConfigError::ZeroPageSize
        );
    }

    #[test]
    fn export_headers_fall_back_to_field_name() {
        let mut config = CrudConfig::builder("catalog.items")
            .export_fields(&[("name", "Name"), ("status", "Status")])
            .build()
            .unwrap();
        config.export.fields.push("created_at");

        assert_eq!(
            config.export.headers_in_order(),
            vec!["Name".to_string(), "Status".to_string(), "created_at".to_string()]
        );
    }

    #[test]
    fn labels_seed_titles() {
        let config = CrudConfig::builder("catalog.items")
            .labels("Item", "Items")
            .build()
            .unwrap();
        assert_eq!(config.titles.create, "New Item");
        assert_eq!(config.titles.edit, "Edit Item #{pk}");
        assert_eq!(config.page_title, "Items");
        assert_eq!(config.export.filename_base, "catalog_items");
    }

    #[test]
    fn declared_extra_filters_are_parsed() {
        fn noop(q: ListQuery, _: &str, _: &RequestContext) -> ListQuery {
            q
        }
        let config = CrudConfig::builder("admin.users")
            .column(ColumnDef::new("username", "Username"))
            .filter(FilterDef::new("status", noop))
            .filter(FilterDef::new("role", noop))
            .build()
            .unwrap();

        let params = config.parse_params([("role", "staff"), ("other", "x")]);
        assert_eq!(params.value_for("role"), "staff");
        assert!(params.extra.get("other").is_none());
    }
}
