//! Active-organization selection.

use orgdesk_auth::Principal;
use orgdesk_core::{OrganizationId, StoreResult, UserId};

use crate::context::{require_actor, run, service_span};
use crate::{ErrorCode, MembershipStore, OrganizationAccess, ServiceErrors, ServiceResult};

/// Organizations the actor may switch to, ordered by name.
pub async fn my_organizations(
    store: &dyn MembershipStore,
    actor: Option<&Principal>,
) -> ServiceResult<Vec<OrganizationAccess>> {
    let span = service_span("my_organizations", actor, None);
    run(span, async move {
        let actor = require_actor(actor)?;
        let mut accesses = store.accesses_of(actor.principal_id).await?;
        accesses.sort_by(|a, b| {
            a.organization
                .name
                .to_lowercase()
                .cmp(&b.organization.name.to_lowercase())
                .then_with(|| a.organization.id.cmp(&b.organization.id))
        });
        Ok(accesses)
    })
    .await
}

/// Confirm the actor may act in `org`; the caller then re-scopes its token.
pub async fn switch_organization(
    store: &dyn MembershipStore,
    actor: Option<&Principal>,
    org: OrganizationId,
) -> ServiceResult<OrganizationAccess> {
    let span = service_span("switch_organization", actor, Some(org));
    run(span, async move {
        let actor = require_actor(actor)?;
        let access = store.active_access(actor.principal_id, org).await?.ok_or_else(|| {
            ServiceErrors::new(ErrorCode::Forbidden, "no active membership in this organization")
        })?;
        tracing::info!("organization switched");
        Ok(access)
    })
    .await
}

/// Earliest active membership in an active organization.
pub async fn default_organization(
    store: &dyn MembershipStore,
    user: UserId,
) -> StoreResult<Option<OrganizationAccess>> {
    let accesses = store.accesses_of(user).await?;
    Ok(accesses.into_iter().min_by(|a, b| {
        a.membership
            .created_at
            .cmp(&b.membership.created_at)
            .then_with(|| a.membership.id.cmp(&b.membership.id))
    }))
}

/// The organization a verified request acts in.
///
/// A requested organization is honoured only while membership and
/// organization are both active; without a request the default applies.
pub async fn resolve_active_organization(
    store: &dyn MembershipStore,
    user: UserId,
    requested: Option<OrganizationId>,
) -> StoreResult<Option<OrganizationAccess>> {
    match requested {
        Some(org) => store.active_access(user, org).await,
        None => default_organization(store, user).await,
    }
}
