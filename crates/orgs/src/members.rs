//! Membership services: create, update, toggle, list, export.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_accounts::User;
use orgdesk_auth::Principal;
use orgdesk_core::{Email, MembershipId, OrganizationId, StoreError, UserId};
use orgdesk_crud::{
    ChunkCursor, Condition, ExportFormat, ExportSpec, ListQuery, OrderKey, RecordSource, Row,
    SortDirection,
};

use crate::context::{require_actor, require_admin_access, require_admin_tx, run, service_span};
use crate::rules::guard_last_admin;
use crate::{
    ErrorCode, Membership, MembershipRole, MembershipStore, ServiceError, ServiceErrors,
    ServiceResult,
};

/// Listing representation of a membership joined with its user.
pub fn member_row(membership: &Membership, user: &User) -> Row {
    Row::new(membership.id)
        .with("organization_id", membership.organization_id)
        .with("user_id", user.id)
        .with("email", user.email.as_str())
        .with("username", user.username.clone())
        .with("first_name", user.first_name.clone())
        .with("last_name", user.last_name.clone())
        .with("role", membership.role.as_str())
        .with("is_active", membership.is_active)
        .with("created_at", membership.created_at)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMember {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    MembershipRole::Member.as_str().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedMember {
    pub member_id: MembershipId,
    pub user_id: UserId,
    pub created_user: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberUpdate {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
}

/// Member listing filters as received from the caller.
///
/// `status` is `active`, `inactive` or anything else for both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberFilter {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
}

impl MemberFilter {
    /// Organization-scoped query ordered by e-mail, username, id.
    pub fn to_query(&self, org: OrganizationId) -> ServiceResult<ListQuery> {
        let mut query = ListQuery::new().eq("organization_id", org);

        let term = self.q.trim();
        if !term.is_empty() {
            query = query.filter(Condition::AnyContains {
                fields: vec!["first_name".into(), "last_name".into(), "email".into()],
                term: term.to_string(),
            });
        }

        let role = self.role.trim();
        if !role.is_empty() {
            query = query.eq("role", MembershipRole::parse(role)?.as_str());
        }

        match self.status.trim() {
            "active" => query = query.eq("is_active", true),
            "inactive" => query = query.eq("is_active", false),
            _ => {}
        }

        Ok(query.order_by(vec![
            OrderKey::field("email", SortDirection::Asc),
            OrderKey::field("username", SortDirection::Asc),
            OrderKey::pk(SortDirection::Asc),
        ]))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberList {
    pub total: u64,
    pub members: Vec<Row>,
}

fn uniqueness(err: StoreError) -> ServiceErrors {
    match err {
        StoreError::Conflict(_) => ServiceErrors::new(
            ErrorCode::AlreadyMember,
            "the user already belongs to this organization",
        ),
        other => other.into(),
    }
}

/// Add a user (found or created by e-mail) to `org`.
pub async fn create_member(
    store: &dyn MembershipStore,
    actor: Option<&Principal>,
    org: OrganizationId,
    input: &NewMember,
    now: DateTime<Utc>,
) -> ServiceResult<CreatedMember> {
    let span = service_span("create_member", actor, Some(org));
    run(
        span,
        async move {
            let actor = require_actor(actor)?;
            let mut tx = store.begin().await?;
            require_admin_tx(tx.as_mut(), actor, org).await?;

            if input.email.trim().is_empty() {
                return Err(ServiceErrors::new(ErrorCode::EmailRequired, "e-mail is required"));
            }
            let role = MembershipRole::parse(input.role.trim())?;
            let email = Email::parse(&input.email).map_err(|e| {
                ServiceErrors::from(ServiceError::new(ErrorCode::ValidationError, e.message()).on_field("email"))
            })?;

            // Another organization may invite the same address concurrently;
            // the insert then hands back the row that won.
            let invited = User::invited(email, &input.first_name, &input.last_name, now);
            let (mut user, created_user) = tx.insert_user_if_absent(&invited).await?;
            if !created_user {
                if user.first_name.is_empty() {
                    user.first_name = input.first_name.trim().to_string();
                }
                if user.last_name.is_empty() {
                    user.last_name = input.last_name.trim().to_string();
                }
                tx.save_user(&user).await?;
            }

            if tx.membership_exists(user.id, org).await? {
                return Err(ServiceErrors::new(
                    ErrorCode::AlreadyMember,
                    "the user already belongs to this organization",
                ));
            }

            let membership = Membership::new(user.id, org, role, now);
            tx.insert_membership(&membership).await.map_err(uniqueness)?;
            tx.commit().await.map_err(uniqueness)?;

            tracing::info!(member_id = %membership.id, user_id = %user.id, created_user, "member created");
            Ok(CreatedMember {
                member_id: membership.id,
                user_id: user.id,
                created_user,
            })
        },
    )
    .await
}

/// Change a member's names, role and active flag.
pub async fn update_member(
    store: &dyn MembershipStore,
    actor: Option<&Principal>,
    org: OrganizationId,
    member_id: MembershipId,
    input: &MemberUpdate,
) -> ServiceResult<Membership> {
    let span = service_span("update_member", actor, Some(org));
    run(
        span,
        async move {
            let actor = require_actor(actor)?;
            let mut tx = store.begin().await?;
            require_admin_tx(tx.as_mut(), actor, org).await?;

            let role = MembershipRole::parse(input.role.trim())?;
            let Some(mut membership) = tx.find_membership(member_id, org).await? else {
                return Err(ServiceErrors::new(ErrorCode::NotFound, "member not found"));
            };

            let others = tx.count_active_admins_excluding(org, membership.id).await?;
            guard_last_admin(&membership, role, input.is_active, others)?;

            let mut user = tx.get_user(membership.user_id).await?;
            user.first_name = input.first_name.trim().to_string();
            user.last_name = input.last_name.trim().to_string();
            tx.save_user(&user).await?;

            membership.role = role;
            membership.is_active = input.is_active;
            tx.save_membership(&membership).await?;
            tx.commit().await?;

            tracing::info!(member_id = %membership.id, role = role.as_str(), active = membership.is_active, "member updated");
            Ok(membership)
        },
    )
    .await
}

/// Set a member's active flag.
pub async fn toggle_member(
    store: &dyn MembershipStore,
    actor: Option<&Principal>,
    org: OrganizationId,
    member_id: MembershipId,
    active: bool,
) -> ServiceResult<Membership> {
    let span = service_span("toggle_member", actor, Some(org));
    run(
        span,
        async move {
            let actor = require_actor(actor)?;
            let mut tx = store.begin().await?;
            require_admin_tx(tx.as_mut(), actor, org).await?;

            let Some(mut membership) = tx.find_membership(member_id, org).await? else {
                return Err(ServiceErrors::new(ErrorCode::NotFound, "member not found"));
            };

            let others = tx.count_active_admins_excluding(org, membership.id).await?;
            guard_last_admin(&membership, membership.role, active, others)?;

            membership.is_active = active;
            tx.save_membership(&membership).await?;
            tx.commit().await?;

            tracing::info!(member_id = %membership.id, active, "member toggled");
            Ok(membership)
        },
    )
    .await
}

/// Members of `org`, for its active admins.
pub async fn list_members(
    store: &dyn MembershipStore,
    members: &dyn RecordSource,
    actor: Option<&Principal>,
    org: OrganizationId,
    filter: &MemberFilter,
) -> ServiceResult<MemberList> {
    let span = service_span("list_members", actor, Some(org));
    run(
        span,
        async move {
            let actor = require_actor(actor)?;
            require_admin_access(store, actor, org, "only organization admins can list members").await?;
            let query = filter.to_query(org)?;

            let total = members.count(&query).await.map_err(source_error)?;
            let rows = members.fetch(&query, 0, total).await.map_err(source_error)?;
            Ok(MemberList { total, members: rows })
        },
    )
    .await
}

fn source_error(err: orgdesk_crud::SourceError) -> ServiceErrors {
    tracing::error!(error = %err, "member source failed");
    ServiceErrors::new(ErrorCode::Internal, "internal error")
}

/// A validated member export, ready to be rendered.
pub struct MemberExport {
    pub format: ExportFormat,
    pub spec: ExportSpec,
    pub cursor: ChunkCursor,
    pub filename_base: String,
    pub sheet_name: &'static str,
    pub title: &'static str,
}

pub const MEMBER_EXPORT_FIELDS: [(&str, &str); 6] = [
    ("email", "E-mail"),
    ("first_name", "First name"),
    ("last_name", "Last name"),
    ("role", "Role"),
    ("is_active", "Active"),
    ("created_at", "Joined"),
];

/// Validate an export of `org`'s members. Nothing is queried yet.
pub async fn export_members(
    store: &dyn MembershipStore,
    members: Arc<dyn RecordSource>,
    actor: Option<&Principal>,
    org: OrganizationId,
    filter: &MemberFilter,
    format: &str,
    chunk_size: u64,
) -> ServiceResult<MemberExport> {
    let span = service_span("export_members", actor, Some(org));
    run(
        span,
        async move {
            let actor = require_actor(actor)?;
            let access =
                require_admin_access(store, actor, org, "only organization admins can export members").await?;

            let Some(format) = ExportFormat::parse(format) else {
                return Err(ServiceErrors::new(
                    ErrorCode::InvalidFormat,
                    format!("unsupported export format '{}'", format.trim()),
                ));
            };
            let query = filter.to_query(org)?;

            let (fields, headers): (Vec<String>, Vec<String>) = MEMBER_EXPORT_FIELDS
                .iter()
                .map(|(f, h)| (f.to_string(), h.to_string()))
                .unzip();
            let spec = ExportSpec::new(fields, headers)
                .map_err(|e| ServiceErrors::new(ErrorCode::Internal, e.to_string()))?;

            tracing::info!(format = %format, "member export started");
            Ok(MemberExport {
                format,
                spec,
                cursor: ChunkCursor::new(members, query, chunk_size),
                filename_base: format!("members_{}", access.organization.slug),
                sheet_name: "Members",
                title: "Members",
            })
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use orgdesk_crud::Value;

    use super::*;

    #[test]
    fn filter_validates_role_and_scopes_to_org() {
        let org = OrganizationId::new();
        let bad = MemberFilter {
            role: "owner".into(),
            ..MemberFilter::default()
        };
        assert_eq!(bad.to_query(org).unwrap_err().code(), ErrorCode::InvalidRole);

        let query = MemberFilter {
            q: " ann ".into(),
            role: "admin".into(),
            status: "inactive".into(),
        }
        .to_query(org)
        .unwrap();
        assert_eq!(query.conditions[0], Condition::Eq("organization_id".into(), Value::from(org)));
        assert_eq!(query.conditions.len(), 4);
        assert_eq!(query.ordering.len(), 3);
    }

    #[test]
    fn unknown_status_lists_everyone() {
        let query = MemberFilter {
            status: "whatever".into(),
            ..MemberFilter::default()
        }
        .to_query(OrganizationId::new())
        .unwrap();
        assert_eq!(query.conditions.len(), 1);
    }
}
