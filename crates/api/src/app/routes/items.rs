use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use orgdesk_catalog::{ItemForm, create_item, delete_item, update_item};
use orgdesk_core::ItemId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Json(form): Json<ItemForm>,
) -> Response {
    let listing = match services.items_listing() {
        Ok(l) => l,
        Err(e) => return errors::registry_error_response(e),
    };
    match create_item(&listing.config, services.items.as_ref(), &ctx.request_context(), &form, Utc::now()).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::item_error_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(form): Json<ItemForm>,
) -> Response {
    let Ok(id) = id.parse::<ItemId>() else {
        return errors::invalid_id("item");
    };
    let listing = match services.items_listing() {
        Ok(l) => l,
        Err(e) => return errors::registry_error_response(e),
    };
    match update_item(&listing.config, services.items.as_ref(), &ctx.request_context(), id, &form).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::item_error_response(e),
    }
}

pub async fn delete(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<ItemId>() else {
        return errors::invalid_id("item");
    };
    let listing = match services.items_listing() {
        Ok(l) => l,
        Err(e) => return errors::registry_error_response(e),
    };
    match delete_item(&listing.config, services.items.as_ref(), &ctx.request_context(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::item_error_response(e),
    }
}
