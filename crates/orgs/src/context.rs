//! Execution context shared by the organization services.

use std::future::Future;

use tracing::{Instrument, Span};

use orgdesk_auth::Principal;
use orgdesk_core::OrganizationId;

use crate::{
    ErrorCode, Membership, MembershipRole, MembershipStore, MembershipTx, OrganizationAccess,
    ServiceErrors, ServiceResult,
};

/// `service` span carrying who acts and in which tenant.
pub fn service_span(service: &'static str, actor: Option<&Principal>, org: Option<OrganizationId>) -> Span {
    tracing::info_span!(
        "service",
        service,
        actor = actor.map(|a| a.principal_id.to_string()).unwrap_or_default(),
        organization = org.map(|o| o.to_string()).unwrap_or_default(),
    )
}

pub fn require_actor(actor: Option<&Principal>) -> ServiceResult<&Principal> {
    actor.ok_or_else(|| ServiceErrors::new(ErrorCode::Unauthorized, "authentication required"))
}

/// Lock the organization and require an active admin membership for `actor`.
pub async fn require_admin_tx(
    tx: &mut dyn MembershipTx,
    actor: &Principal,
    org: OrganizationId,
) -> ServiceResult<Membership> {
    let organization = tx.lock_organization(org).await?;
    if !organization.is_some_and(|o| o.is_active) {
        return Err(ServiceErrors::new(ErrorCode::Forbidden, "organization is not available"));
    }
    match tx.find_active_membership(actor.principal_id, org).await? {
        Some(m) if m.role == MembershipRole::Admin => Ok(m),
        _ => Err(ServiceErrors::new(
            ErrorCode::Forbidden,
            "only organization admins can manage members",
        )),
    }
}

/// Active membership of `actor` in an active `org`, outside a transaction.
pub async fn require_access(
    store: &dyn MembershipStore,
    actor: &Principal,
    org: OrganizationId,
) -> ServiceResult<OrganizationAccess> {
    store
        .active_access(actor.principal_id, org)
        .await?
        .ok_or_else(|| ServiceErrors::new(ErrorCode::Forbidden, "no active membership in this organization"))
}

/// [`require_access`] restricted to organization admins.
pub async fn require_admin_access(
    store: &dyn MembershipStore,
    actor: &Principal,
    org: OrganizationId,
    denied: &'static str,
) -> ServiceResult<OrganizationAccess> {
    let access = require_access(store, actor, org).await?;
    if access.membership.role != MembershipRole::Admin {
        return Err(ServiceErrors::new(ErrorCode::Forbidden, denied));
    }
    Ok(access)
}

/// Log a rejection with its code and pass it through.
pub fn rejected<T>(result: ServiceResult<T>) -> ServiceResult<T> {
    if let Err(errors) = &result {
        match errors.code() {
            ErrorCode::Internal => tracing::warn!(code = %errors.code(), "service failed"),
            code => tracing::info!(code = %code, message = %errors.first().message, "service rejected"),
        }
    }
    result
}

/// Run a service body inside its span, logging rejections there.
pub async fn run<T, F>(span: Span, body: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    async move { rejected(body.await) }.instrument(span).await
}
