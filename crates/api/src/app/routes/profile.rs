//! Sign-up, e-mail verification and the caller's own profile.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use orgdesk_accounts::{
    ProfileForm, RegistrationForm, get_profile, register_user, update_profile, verify_email,
};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(form): Json<RegistrationForm>,
) -> Response {
    match register_user(
        services.users.as_ref(),
        &services.verifier,
        services.notifier.as_ref(),
        &form,
        Utc::now(),
    )
    .await
    {
        Ok(registration) => (StatusCode::CREATED, Json(registration)).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn verify(
    Extension(services): Extension<Arc<AppServices>>,
    Path(token): Path<String>,
) -> Response {
    match verify_email(services.users.as_ref(), &services.verifier, &token, Utc::now()).await {
        Ok(outcome) => Json(json!({ "status": outcome })).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Response {
    match get_profile(services.users.as_ref(), ctx.principal().principal_id).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Json(form): Json<ProfileForm>,
) -> Response {
    match update_profile(services.users.as_ref(), ctx.principal().principal_id, &form).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}
