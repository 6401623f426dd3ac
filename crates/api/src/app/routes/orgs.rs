use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use orgdesk_orgs::{my_organizations, switch_organization};

use crate::app::dto::{OrganizationSummary, SwitchOrganizationRequest, SwitchOrganizationResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Response {
    let current = ctx.organization().map(|a| a.organization.id);
    match my_organizations(services.memberships.as_ref(), Some(ctx.principal())).await {
        Ok(accesses) => Json(
            accesses
                .iter()
                .map(|a| OrganizationSummary::from_access(a, current))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_errors_response(e),
    }
}

/// Verify the membership, then re-issue the token scoped to the organization.
pub async fn switch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Json(body): Json<SwitchOrganizationRequest>,
) -> Response {
    let access = match switch_organization(
        services.memberships.as_ref(),
        Some(ctx.principal()),
        body.organization_id,
    )
    .await
    {
        Ok(a) => a,
        Err(e) => return errors::service_errors_response(e),
    };

    let claims = ctx
        .claims()
        .switched_to(access.organization.id, Utc::now(), services.token_ttl);
    match services.jwt.issue(&claims) {
        Ok(token) => Json(SwitchOrganizationResponse {
            token,
            organization: OrganizationSummary::from_access(&access, Some(access.organization.id)),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "token signing failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}
