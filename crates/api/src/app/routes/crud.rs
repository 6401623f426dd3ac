use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::{IntoResponse, Response},
};

use orgdesk_crud::view::ListFragment;
use orgdesk_crud::{CrudParams, Listing, build_list, export_request, pipeline::compose};

use crate::app::download::{self, Download};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

fn params_for(listing: &Listing, raw: &[(String, String)]) -> CrudParams {
    listing
        .config
        .parse_params(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn is_fragment_request(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// One page of a registered listing; `HX-Request: true` gets rows only.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(slug): Path<String>,
    Query(raw): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let listing = match services.listing(&slug) {
        Ok(l) => l,
        Err(e) => return errors::registry_error_response(e),
    };
    let params = params_for(listing, &raw);

    match build_list(&listing.config, listing.source.as_ref(), &ctx.request_context(), &params).await {
        Ok(view) if is_fragment_request(&headers) => Json(ListFragment::from(view)).into_response(),
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::crud_error_response(e),
    }
}

/// Export every row matching the current filters, search and ordering.
pub async fn export(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((slug, format)): Path<(String, String)>,
    Query(raw): Query<Vec<(String, String)>>,
) -> Response {
    let listing = match services.listing(&slug) {
        Ok(l) => l,
        Err(e) => return errors::registry_error_response(e),
    };
    let request = ctx.request_context();
    let (format, spec) = match export_request(&listing.config, &request, &format) {
        Ok(v) => v,
        Err(e) => return errors::crud_error_response(e),
    };

    let params = params_for(listing, &raw);
    let query = compose(&listing.config, &params, &request);
    tracing::info!(slug = %slug, format = %format, "export started");

    let export = &listing.config.export;
    download::respond(Download {
        format,
        spec,
        cursor: orgdesk_crud::ChunkCursor::new(listing.source.clone(), query, services.export_chunk_size),
        filename_base: export.filename_base.clone(),
        sheet_name: export.sheet_name.clone(),
        title: export.title.clone(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn fragment_header_must_be_true() {
        let mut headers = HeaderMap::new();
        assert!(!is_fragment_request(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("false"));
        assert!(!is_fragment_request(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_fragment_request(&headers));
    }
}
