use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use orgdesk_accounts::{User, UserStore};
use orgdesk_core::{Email, StoreError, StoreResult, UserId};

use super::map_sqlx_error;

pub(crate) const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active, \
    email_verified, is_staff, is_superuser, date_joined, last_login";

pub(crate) fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email).map_err(|e| sqlx::Error::ColumnDecode {
        index: "email".into(),
        source: e.to_string().into(),
    })?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        email,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_active: row.try_get("is_active")?,
        email_verified: row.try_get("email_verified")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
        date_joined: row.try_get("date_joined")?,
        last_login: row.try_get("last_login")?,
    })
}

pub struct PgUserStore {
    pool: Arc<PgPool>,
}

impl PgUserStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get(&self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .ok_or(StoreError::NotFound("user"))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("get_user", e))
    }

    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_email", e))
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_username", e))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
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
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(active)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_user_active", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn save_profile(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1")
            .bind(user.id.as_uuid())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.email.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_profile", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn mark_verified(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = TRUE, email_verified = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_verified", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }
}
