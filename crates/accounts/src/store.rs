use async_trait::async_trait;

use orgdesk_core::{Email, StoreResult, UserId};

use crate::User;

/// User persistence port. Users are never deleted.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `StoreError::NotFound` when absent.
    async fn get(&self, id: UserId) -> StoreResult<User>;

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// `StoreError::Conflict` when the username or e-mail is taken.
    async fn insert(&self, user: &User) -> StoreResult<()>;

    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()>;

    /// Writes names and e-mail only. `StoreError::Conflict` when the e-mail
    /// belongs to another account.
    async fn save_profile(&self, user: &User) -> StoreResult<()>;

    /// Activates the account and records the address as verified.
    async fn mark_verified(&self, id: UserId) -> StoreResult<()>;
}
