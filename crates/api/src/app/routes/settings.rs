use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    response::{IntoResponse, Response},
};

use orgdesk_orgs::{SettingsForm, get_settings, update_settings};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Response {
    match get_settings(&services.settings_config, services.settings.as_ref(), &ctx.request_context()).await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => errors::settings_error_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Json(form): Json<SettingsForm>,
) -> Response {
    match update_settings(&services.settings_config, services.settings.as_ref(), &ctx.request_context(), &form).await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => errors::settings_error_response(e),
    }
}
