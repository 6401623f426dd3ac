//! Organization members. Every handler acts in the request's active organization.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use orgdesk_core::{MembershipId, OrganizationId};
use orgdesk_orgs::{
    MemberFilter, MemberUpdate, NewMember, create_member, export_members, list_members,
    toggle_member, update_member,
};

use crate::app::download::{self, Download};
use crate::app::dto::ToggleMemberRequest;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

fn active_org(ctx: &PrincipalContext) -> Result<OrganizationId, Response> {
    ctx.organization()
        .map(|access| access.organization.id)
        .ok_or_else(errors::organization_required)
}

fn member_id(raw: &str) -> Result<MembershipId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("member"))
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(filter): Query<MemberFilter>,
) -> Response {
    let org = match active_org(&ctx) {
        Ok(org) => org,
        Err(r) => return r,
    };
    match list_members(
        services.memberships.as_ref(),
        services.members.as_ref(),
        Some(ctx.principal()),
        org,
        &filter,
    )
    .await
    {
        Ok(list) => Json(list).into_response(),
        Err(e) => errors::service_errors_response(e),
    }
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Json(input): Json<NewMember>,
) -> Response {
    let org = match active_org(&ctx) {
        Ok(org) => org,
        Err(r) => return r,
    };
    match create_member(services.memberships.as_ref(), Some(ctx.principal()), org, &input, Utc::now()).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::service_errors_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(input): Json<MemberUpdate>,
) -> Response {
    let (org, id) = match active_org(&ctx).and_then(|org| Ok((org, member_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match update_member(services.memberships.as_ref(), Some(ctx.principal()), org, id, &input).await {
        Ok(membership) => Json(membership).into_response(),
        Err(e) => errors::service_errors_response(e),
    }
}

pub async fn toggle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<ToggleMemberRequest>,
) -> Response {
    let (org, id) = match active_org(&ctx).and_then(|org| Ok((org, member_id(&id)?))) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match toggle_member(services.memberships.as_ref(), Some(ctx.principal()), org, id, body.is_active).await {
        Ok(membership) => Json(membership).into_response(),
        Err(e) => errors::service_errors_response(e),
    }
}

pub async fn export(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(format): Path<String>,
    Query(filter): Query<MemberFilter>,
) -> Response {
    let org = match active_org(&ctx) {
        Ok(org) => org,
        Err(r) => return r,
    };
    let export = match export_members(
        services.memberships.as_ref(),
        services.members.clone(),
        Some(ctx.principal()),
        org,
        &filter,
        &format,
        services.export_chunk_size,
    )
    .await
    {
        Ok(e) => e,
        Err(e) => return errors::service_errors_response(e),
    };

    download::respond(Download {
        format: export.format,
        spec: export.spec,
        cursor: export.cursor,
        filename_base: export.filename_base,
        sheet_name: export.sheet_name.to_string(),
        title: export.title.to_string(),
    })
    .await
}
