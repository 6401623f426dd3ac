//! Query composition: base scope → search → filters → ordering.
//!
//! Every step is a pure function of the descriptor, the parameters and the
//! request; none of them touches storage.

use crate::params::is_blank_or_all;
use crate::{Condition, CrudConfig, CrudParams, ListQuery, OrderKey, RequestContext};

/// OR-combined case-insensitive substring match across the search fields.
pub fn apply_search(config: &CrudConfig, query: ListQuery, params: &CrudParams) -> ListQuery {
    let term = params.q.trim();
    if term.is_empty() || config.search_fields.is_empty() {
        return query;
    }
    query.filter(Condition::AnyContains {
        fields: config.search_fields.iter().map(|f| f.to_string()).collect(),
        term: term.to_string(),
    })
}

/// Run each declared filter whose raw value is neither blank nor `all`.
pub fn apply_filters(
    config: &CrudConfig,
    mut query: ListQuery,
    params: &CrudParams,
    ctx: &RequestContext,
) -> ListQuery {
    for filter in &config.filters {
        let raw = params.value_for(filter.name).trim();
        if is_blank_or_all(raw) {
            continue;
        }
        query = (filter.apply)(query, raw, ctx);
    }
    query
}

/// Resolve the sort key against the columns and always end on the primary key.
///
/// Unknown keys, unsortable columns and columns without order fields fall
/// back to primary-key ordering in the requested direction.
pub fn apply_ordering(config: &CrudConfig, query: ListQuery, params: &CrudParams) -> ListQuery {
    let key = if params.sort.is_empty() {
        config.default_sort_key
    } else {
        params.sort.as_str()
    };
    let direction = params.direction();

    let fields: &[&'static str] = match config.column(key) {
        Some(col) if col.sortable => &col.order_by,
        _ => &[],
    };

    let mut ordering: Vec<OrderKey> = fields
        .iter()
        .map(|f| OrderKey::field(*f, direction))
        .collect();
    ordering.push(OrderKey::pk(direction));

    query.order_by(ordering)
}

/// Full pipeline for a list or export request.
pub fn compose(config: &CrudConfig, params: &CrudParams, ctx: &RequestContext) -> ListQuery {
    let query = (config.base_scope)(ctx);
    let query = apply_search(config, query, params);
    let query = apply_filters(config, query, params, ctx);
    apply_ordering(config, query, params)
}
