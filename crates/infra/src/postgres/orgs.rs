use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use orgdesk_accounts::User;
use orgdesk_core::{Email, MembershipId, OrganizationId, Slug, StoreError, StoreResult, UserId};
use orgdesk_orgs::{
    Membership, MembershipRole, MembershipStore, MembershipTx, Organization, OrganizationAccess,
    SiteSettings,
};

use super::map_sqlx_error;
use super::settings::{LOCK_SETTINGS, SEED_SETTINGS, settings_from_json, upsert_settings};
use super::users::{USER_COLUMNS, user_from_row};

const ORGANIZATION_COLUMNS: &str = "o.id AS org_id, o.name AS org_name, o.slug AS org_slug, \
    o.is_active AS org_is_active, o.created_at AS org_created_at, o.updated_at AS org_updated_at";

/// Losing a unique race yields no row instead of an error, which would
/// abort the surrounding transaction.
fn insert_user_if_absent_sql() -> String {
    format!(
        "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT DO NOTHING RETURNING {USER_COLUMNS}"
    )
}

const MEMBERSHIP_COLUMNS: &str = "m.id, m.user_id, m.organization_id, m.role, m.is_active, m.created_at";

fn decode_error(column: &str, message: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}

fn organization_from_row(row: &PgRow) -> Result<Organization, sqlx::Error> {
    let slug: String = row.try_get("org_slug")?;
    let slug = Slug::parse(&slug).map_err(|e| decode_error("org_slug", e.to_string()))?;
    Ok(Organization {
        id: OrganizationId::from_uuid(row.try_get("org_id")?),
        name: row.try_get("org_name")?,
        slug,
        is_active: row.try_get("org_is_active")?,
        created_at: row.try_get("org_created_at")?,
        updated_at: row.try_get("org_updated_at")?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<Membership, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = MembershipRole::parse(&role).map_err(|e| decode_error("role", e.message))?;
    Ok(Membership {
        id: MembershipId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        organization_id: OrganizationId::from_uuid(row.try_get("organization_id")?),
        role,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn access_from_row(row: &PgRow) -> Result<OrganizationAccess, sqlx::Error> {
    Ok(OrganizationAccess {
        organization: organization_from_row(row)?,
        membership: membership_from_row(row)?,
    })
}

/// Organizations and memberships.
///
/// Membership transactions start with `SELECT … FOR UPDATE` on the
/// organization row, so concurrent changes to one organization's members
/// run one after the other.
pub struct PgOrgStore {
    pool: Arc<PgPool>,
}

impl PgOrgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for PgOrgStore {
    async fn begin(&self) -> StoreResult<Box<dyn MembershipTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_membership_tx", e))?;
        Ok(Box::new(PgOrgTx { tx }))
    }

    #[instrument(skip(self), fields(user_id = %user, organization_id = %org), err)]
    async fn active_access(
        &self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<OrganizationAccess>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS}, {ORGANIZATION_COLUMNS} \
             FROM memberships m JOIN organizations o ON o.id = m.organization_id \
             WHERE m.user_id = $1 AND m.organization_id = $2 AND m.is_active AND o.is_active"
        ))
        .bind(user.as_uuid())
        .bind(org.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("active_access", e))?;
        row.as_ref()
            .map(access_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("active_access", e))
    }

    #[instrument(skip(self), fields(user_id = %user), err)]
    async fn accesses_of(&self, user: UserId) -> StoreResult<Vec<OrganizationAccess>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS}, {ORGANIZATION_COLUMNS} \
             FROM memberships m JOIN organizations o ON o.id = m.organization_id \
             WHERE m.user_id = $1 AND m.is_active AND o.is_active"
        ))
        .bind(user.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("accesses_of", e))?;
        rows.iter()
            .map(access_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("accesses_of", e))
    }
}

/// One database transaction. Dropped without commit, sqlx rolls it back.
struct PgOrgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgOrgTx {
    async fn find_user_by_email(&mut self, email: &Email) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 FOR UPDATE"))
            .bind(email.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_email", e))
    }
}

#[async_trait]
impl MembershipTx for PgOrgTx {
    async fn lock_organization(&mut self, org: OrganizationId) -> StoreResult<Option<Organization>> {
        let row = sqlx::query(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations o WHERE o.id = $1 FOR UPDATE"
        ))
        .bind(org.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_organization", e))?;
        row.as_ref()
            .map(organization_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("lock_organization", e))
    }

    async fn find_active_membership(
        &mut self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<Membership>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m \
             WHERE m.user_id = $1 AND m.organization_id = $2 AND m.is_active"
        ))
        .bind(user.as_uuid())
        .bind(org.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_active_membership", e))?;
        row.as_ref()
            .map(membership_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_active_membership", e))
    }

    async fn find_membership(
        &mut self,
        id: MembershipId,
        org: OrganizationId,
    ) -> StoreResult<Option<Membership>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m WHERE m.id = $1 AND m.organization_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(org.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_membership", e))?;
        row.as_ref()
            .map(membership_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_membership", e))
    }

    async fn count_active_admins_excluding(
        &mut self,
        org: OrganizationId,
        exclude: MembershipId,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships \
             WHERE organization_id = $1 AND id <> $2 AND is_active AND role = 'admin'",
        )
        .bind(org.as_uuid())
        .bind(exclude.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("count_active_admins", e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn membership_exists(&mut self, user: UserId, org: OrganizationId) -> StoreResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM memberships WHERE user_id = $1 AND organization_id = $2)",
        )
        .bind(user.as_uuid())
        .bind(org.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("membership_exists", e))
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO memberships (id, user_id, organization_id, role, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(membership.id.as_uuid())
        .bind(membership.user_id.as_uuid())
        .bind(membership.organization_id.as_uuid())
        .bind(membership.role.as_str())
        .bind(membership.is_active)
        .bind(membership.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_membership", e))?;
        Ok(())
    }

    async fn save_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE memberships SET role = $2, is_active = $3 WHERE id = $1 AND organization_id = $4",
        )
        .bind(membership.id.as_uuid())
        .bind(membership.role.as_str())
        .bind(membership.is_active)
        .bind(membership.organization_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_membership", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("membership"));
        }
        Ok(())
    }

    async fn insert_organization(&mut self, organization: &Organization) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO organizations (id, name, slug, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(organization.slug.as_str())
        .bind(organization.is_active)
        .bind(organization.created_at)
        .bind(organization.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_organization", e))?;
        Ok(())
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> StoreResult<(User, bool)> {
        let inserted = sqlx::query(&insert_user_if_absent_sql())
            .bind(user.id.as_uuid())
            .bind(&user.username)
            .bind(user.email.as_str())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_active)
            .bind(user.email_verified)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.date_joined)
            .bind(user.last_login)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        if let Some(row) = inserted {
            let created = user_from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))?;
            return Ok((created, true));
        }

        match self.find_user_by_email(&user.email).await? {
            Some(existing) => Ok((existing, false)),
            None => Err(StoreError::Conflict(format!("username '{}' is taken", user.username))),
        }
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, is_active = $4, is_staff = $5, \
             is_superuser = $6 WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn get_user(&mut self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .ok_or(StoreError::NotFound("user"))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("get_user", e))
    }

    async fn lock_settings(&mut self) -> StoreResult<SiteSettings> {
        let defaults = serde_json::to_value(SiteSettings::default()).map_err(StoreError::backend)?;
        sqlx::query(SEED_SETTINGS)
            .bind(Json(defaults))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("seed_settings", e))?;
        let data: Option<Json<serde_json::Value>> = sqlx::query_scalar(LOCK_SETTINGS)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_settings", e))?;
        settings_from_json(data)
    }

    async fn save_settings(&mut self, settings: &SiteSettings) -> StoreResult<()> {
        upsert_settings(&mut *self.tx, settings).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_membership_tx", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_insert_yields_nothing_on_conflict() {
        let sql = insert_user_if_absent_sql();
        assert!(sql.starts_with("INSERT INTO users (id, username, email,"));
        assert!(sql.ends_with(&format!("ON CONFLICT DO NOTHING RETURNING {USER_COLUMNS}")));
        assert_eq!(USER_COLUMNS.split(',').count(), 11);
        assert!(sql.contains("$11)"));
    }

    #[test]
    fn settings_row_is_seeded_before_it_is_locked() {
        assert!(SEED_SETTINGS.ends_with("ON CONFLICT (id) DO NOTHING"));
        assert!(LOCK_SETTINGS.ends_with("WHERE id = 1 FOR UPDATE"));
    }
}
