use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use orgdesk_auth::JwtClaims;
use orgdesk_orgs::{SetupForm, complete_setup as run_setup};

use crate::app::dto::{OrganizationSummary, SetupResponse, SetupStatus, WhoAmI};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<PrincipalContext>) -> impl IntoResponse {
    let principal = ctx.principal();
    Json(WhoAmI {
        user_id: principal.principal_id,
        roles: principal.roles.iter().map(|r| r.as_str().to_string()).collect(),
        permissions: principal.permissions.iter().map(|p| p.as_str().to_string()).collect(),
        organization: ctx
            .organization()
            .map(|access| OrganizationSummary::from_access(access, Some(access.organization.id))),
    })
}

pub async fn setup_status(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.settings.load().await {
        Ok(settings) => Json(SetupStatus {
            setup_complete: settings.setup_complete,
            site_name: settings.site_name,
        })
        .into_response(),
        Err(e) => errors::store_error_response(e),
    }
}

/// Run the setup wizard and hand back a token for the new superuser.
pub async fn complete_setup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(form): Json<SetupForm>,
) -> Response {
    let now = Utc::now();
    let outcome = match run_setup(services.memberships.as_ref(), &form, now).await {
        Ok(o) => o,
        Err(e) => return errors::service_errors_response(e),
    };

    let user = match services.users.get(outcome.admin_user_id).await {
        Ok(u) => u,
        Err(e) => return errors::store_error_response(e),
    };
    let claims = JwtClaims::new(user.id, user.roles(), now, services.token_ttl).switched_to(
        outcome.organization_id,
        now,
        services.token_ttl,
    );
    let token = match services.jwt.issue(&claims) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "token signing failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error");
        }
    };

    (StatusCode::CREATED, Json(SetupResponse { outcome, token })).into_response()
}
