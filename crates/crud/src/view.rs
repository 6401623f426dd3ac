//! List materialization.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::column::ColumnMeta;
use crate::config::{FormTitles, StatusOption};
use crate::pipeline::compose;
use crate::{CrudConfig, CrudError, CrudParams, PageInfo, Paginator, RecordSource, RequestContext, RowUrls, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub key: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: Value,
    pub cells: Vec<Cell>,
    pub urls: RowUrls,
}

/// Everything a client needs to render one page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    pub slug: String,
    pub page_title: String,
    pub entity_label: String,
    pub entity_label_plural: String,
    pub titles: FormTitles,
    pub current_filters: BTreeMap<String, String>,
    pub status_options: Vec<StatusOption>,
    pub columns: Vec<ColumnMeta>,
    pub items: Vec<ListRow>,
    pub page: PageInfo,
    pub total_count: u64,
    /// Query string without `page`, for pagination links.
    pub qs: String,
}

/// Rows-only subset of a [`ListView`] for in-page navigation.
#[derive(Debug, Clone, Serialize)]
pub struct ListFragment {
    pub items: Vec<ListRow>,
    pub page: PageInfo,
    pub total_count: u64,
    pub qs: String,
}

impl From<ListView> for ListFragment {
    fn from(view: ListView) -> Self {
        Self {
            items: view.items,
            page: view.page,
            total_count: view.total_count,
            qs: view.qs,
        }
    }
}

/// Append `?qs` so actions can return to the same list state.
///
/// Left alone when there is no state, the URL is a placeholder (`#`, empty)
/// or it already carries a query string.
pub fn with_list_state(url: Option<String>, qs: &str) -> Option<String> {
    url.map(|u| {
        if qs.is_empty() || u.is_empty() || u == "#" || u.contains('?') {
            u
        } else {
            format!("{u}?{qs}")
        }
    })
}

/// Check permission, compose the query, paginate and build row cells.
#[tracing::instrument(skip_all, fields(slug = %config.slug))]
pub async fn build_list(
    config: &CrudConfig,
    source: &dyn RecordSource,
    ctx: &RequestContext,
    params: &CrudParams,
) -> Result<ListView, CrudError> {
    config.permissions.list.check(ctx)?;

    let query = compose(config, params, ctx);
    let total_count = source.count(&query).await?;
    let page = Paginator::new(total_count, config.page_size).page(&params.page);

    let rows = if total_count == 0 {
        Vec::new()
    } else {
        source.fetch(&query, page.offset(), config.page_size).await?
    };

    let state = params.query_string();
    let items = rows
        .iter()
        .map(|row| {
            let urls = (config.row_urls)(row);
            ListRow {
                id: row.pk().clone(),
                cells: config
                    .columns
                    .iter()
                    .map(|col| Cell {
                        key: col.key,
                        value: col.cell(row),
                    })
                    .collect(),
                urls: RowUrls {
                    detail: with_list_state(urls.detail, &state),
                    edit: with_list_state(urls.edit, &state),
                    delete: with_list_state(urls.delete, &state),
                },
            }
        })
        .collect();

    tracing::debug!(total_count, page = page.number, "list built");

    Ok(ListView {
        slug: config.slug.clone(),
        page_title: config.page_title.clone(),
        entity_label: config.entity_label.clone(),
        entity_label_plural: config.entity_label_plural.clone(),
        titles: config.titles.clone(),
        current_filters: params.current_filters(),
        status_options: config.status_options.clone(),
        columns: config.columns.iter().map(|c| c.meta()).collect(),
        items,
        page,
        total_count,
        qs: params.query_string_without_page(),
    })
}
