//! Organization / membership persistence ports.
//!
//! Mutating services run inside one [`MembershipTx`]. Implementations must
//! serialise transactions that touch the same organization (the first call
//! of every mutating service is [`MembershipTx::lock_organization`]).

use async_trait::async_trait;

use orgdesk_accounts::User;
use orgdesk_core::{MembershipId, OrganizationId, StoreResult, UserId};

use crate::{Membership, Organization, OrganizationAccess, SiteSettings};

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn MembershipTx>>;

    /// The user's membership in `org` when both it and the organization are active.
    async fn active_access(
        &self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<OrganizationAccess>>;

    /// Every active membership of `user` in an active organization, any order.
    async fn accesses_of(&self, user: UserId) -> StoreResult<Vec<OrganizationAccess>>;
}

#[async_trait]
pub trait MembershipTx: Send {
    /// Lock the organization row for the rest of the transaction.
    async fn lock_organization(&mut self, org: OrganizationId) -> StoreResult<Option<Organization>>;

    async fn find_active_membership(
        &mut self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<Membership>>;

    /// Membership `id` if it belongs to `org`.
    async fn find_membership(
        &mut self,
        id: MembershipId,
        org: OrganizationId,
    ) -> StoreResult<Option<Membership>>;

    async fn count_active_admins_excluding(
        &mut self,
        org: OrganizationId,
        exclude: MembershipId,
    ) -> StoreResult<u64>;

    async fn membership_exists(&mut self, user: UserId, org: OrganizationId) -> StoreResult<bool>;

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()>;

    async fn save_membership(&mut self, membership: &Membership) -> StoreResult<()>;

    async fn insert_organization(&mut self, organization: &Organization) -> StoreResult<()>;

    /// Insert `user` unless its e-mail (or username) is already taken, and
    /// return the stored row locked for the rest of the transaction. The flag
    /// is `true` when this call created it.
    async fn insert_user_if_absent(&mut self, user: &User) -> StoreResult<(User, bool)>;

    /// Persist profile names and global flags of an existing user.
    async fn save_user(&mut self, user: &User) -> StoreResult<()>;

    async fn get_user(&mut self, id: UserId) -> StoreResult<User>;

    /// Lock the site settings singleton and read it (defaults before first save).
    async fn lock_settings(&mut self) -> StoreResult<SiteSettings>;

    async fn save_settings(&mut self, settings: &SiteSettings) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
