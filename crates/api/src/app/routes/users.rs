use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
};

use orgdesk_accounts::toggle_user;
use orgdesk_core::UserId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn toggle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<UserId>() else {
        return errors::invalid_id("user");
    };
    let listing = match services.users_listing() {
        Ok(l) => l,
        Err(e) => return errors::registry_error_response(e),
    };
    match toggle_user(&listing.config, services.users.as_ref(), &ctx.request_context(), id).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}
