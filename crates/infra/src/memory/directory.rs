//! Users, organizations, memberships and site settings behind one async mutex.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use orgdesk_accounts::{User, UserStore};
use orgdesk_core::{Email, MembershipId, OrganizationId, StoreError, StoreResult, UserId};
use orgdesk_crud::Row;
use orgdesk_orgs::{
    Membership, MembershipStore, MembershipTx, Organization, OrganizationAccess, SiteSettings,
    member_row,
};

/// The relational part of the in-memory backend.
#[derive(Debug, Clone, Default)]
pub(crate) struct Directory {
    users: BTreeMap<UserId, User>,
    organizations: BTreeMap<OrganizationId, Organization>,
    memberships: BTreeMap<MembershipId, Membership>,
    settings: Option<SiteSettings>,
}

impl Directory {
    fn access(&self, user: UserId, org: OrganizationId) -> Option<OrganizationAccess> {
        let organization = self.organizations.get(&org).filter(|o| o.is_active)?;
        let membership = self
            .memberships
            .values()
            .find(|m| m.user_id == user && m.organization_id == org && m.is_active)?;
        Some(OrganizationAccess {
            organization: organization.clone(),
            membership: membership.clone(),
        })
    }

    fn user_by_email(&self, email: &Email) -> Option<&User> {
        self.users.values().find(|u| &u.email == email)
    }

    fn put_user(&mut self, user: &User, replace: bool) -> StoreResult<()> {
        let taken = self
            .users
            .values()
            .any(|u| u.id != user.id && (u.email == user.email || u.username == user.username));
        if taken {
            return Err(StoreError::Conflict(format!("user '{}' already exists", user.email)));
        }
        match (self.users.contains_key(&user.id), replace) {
            (true, false) => Err(StoreError::Conflict(format!("user {} already exists", user.id))),
            (false, true) => Err(StoreError::NotFound("user")),
            _ => {
                self.users.insert(user.id, user.clone());
                Ok(())
            }
        }
    }

    fn put_organization(&mut self, organization: &Organization, replace: bool) -> StoreResult<()> {
        let taken = self
            .organizations
            .values()
            .any(|o| o.id != organization.id && o.slug == organization.slug);
        if taken {
            return Err(StoreError::Conflict(format!(
                "organization slug '{}' already exists",
                organization.slug
            )));
        }
        match (self.organizations.contains_key(&organization.id), replace) {
            (true, false) => Err(StoreError::Conflict(format!(
                "organization {} already exists",
                organization.id
            ))),
            (false, true) => Err(StoreError::NotFound("organization")),
            _ => {
                self.organizations.insert(organization.id, organization.clone());
                Ok(())
            }
        }
    }

    fn put_membership(&mut self, membership: &Membership, replace: bool) -> StoreResult<()> {
        let duplicate = self.memberships.values().any(|m| {
            m.id != membership.id
                && m.user_id == membership.user_id
                && m.organization_id == membership.organization_id
        });
        if duplicate {
            return Err(StoreError::Conflict("membership for this user and organization already exists".into()));
        }
        if !self.users.contains_key(&membership.user_id) {
            return Err(StoreError::NotFound("user"));
        }
        if !self.organizations.contains_key(&membership.organization_id) {
            return Err(StoreError::NotFound("organization"));
        }
        match (self.memberships.contains_key(&membership.id), replace) {
            (true, false) => Err(StoreError::Conflict(format!("membership {} already exists", membership.id))),
            (false, true) => Err(StoreError::NotFound("membership")),
            _ => {
                self.memberships.insert(membership.id, membership.clone());
                Ok(())
            }
        }
    }

    pub(crate) fn user_rows(&self) -> Vec<Row> {
        self.users.values().map(User::to_row).collect()
    }

    pub(crate) fn member_rows(&self) -> Vec<Row> {
        self.memberships
            .values()
            .filter_map(|m| self.users.get(&m.user_id).map(|u| member_row(m, u)))
            .collect()
    }
}

/// Shared handle on the directory.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedDirectory(Arc<Mutex<Directory>>);

impl SharedDirectory {
    pub(crate) async fn read<T>(&self, f: impl FnOnce(&Directory) -> T) -> T {
        let guard = self.0.lock().await;
        f(&guard)
    }

    async fn write<T>(&self, f: impl FnOnce(&mut Directory) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.0.lock().await;
        f(&mut guard)
    }

    pub(crate) async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.write(|d| d.put_user(user, false)).await
    }

    pub(crate) async fn insert_organization(&self, organization: &Organization) -> StoreResult<()> {
        self.write(|d| d.put_organization(organization, false)).await
    }

    pub(crate) async fn save_organization(&self, organization: &Organization) -> StoreResult<()> {
        self.write(|d| d.put_organization(organization, true)).await
    }

    pub(crate) async fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        self.write(|d| d.put_membership(membership, false)).await
    }

    pub(crate) async fn settings(&self) -> SiteSettings {
        self.read(|d| d.settings.clone().unwrap_or_default()).await
    }

    pub(crate) async fn save_settings(&self, settings: &SiteSettings) -> StoreResult<()> {
        self.write(|d| {
            d.settings = Some(settings.clone());
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserStore for SharedDirectory {
    async fn get(&self, id: UserId) -> StoreResult<User> {
        self.read(|d| d.users.get(&id).cloned())
            .await
            .ok_or(StoreError::NotFound("user"))
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        Ok(self
            .read(|d| d.user_by_email(email).cloned())
            .await)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read(|d| d.users.values().find(|u| u.username == username).cloned())
            .await)
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        self.insert_user(user).await
    }

    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()> {
        self.write(|d| {
            let user = d.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
            user.is_active = active;
            Ok(())
        })
        .await
    }

    async fn save_profile(&self, user: &User) -> StoreResult<()> {
        self.write(|d| {
            let mut stored = d.users.get(&user.id).cloned().ok_or(StoreError::NotFound("user"))?;
            stored.first_name = user.first_name.clone();
            stored.last_name = user.last_name.clone();
            stored.email = user.email.clone();
            d.put_user(&stored, true)
        })
        .await
    }

    async fn mark_verified(&self, id: UserId) -> StoreResult<()> {
        self.write(|d| {
            let user = d.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
            user.is_active = true;
            user.email_verified = true;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MembershipStore for SharedDirectory {
    async fn begin(&self) -> StoreResult<Box<dyn MembershipTx>> {
        let guard = self.0.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(DirectoryTx { guard, work }))
    }

    async fn active_access(
        &self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<OrganizationAccess>> {
        Ok(self.read(|d| d.access(user, org)).await)
    }

    async fn accesses_of(&self, user: UserId) -> StoreResult<Vec<OrganizationAccess>> {
        Ok(self
            .read(|d| {
                d.memberships
                    .values()
                    .filter(|m| m.user_id == user)
                    .filter_map(|m| d.access(user, m.organization_id))
                    .collect()
            })
            .await)
    }
}

/// A membership transaction: holds the directory lock until commit or drop
/// and edits a working copy. Dropping without commit discards the copy.
struct DirectoryTx {
    guard: OwnedMutexGuard<Directory>,
    work: Directory,
}

#[async_trait]
impl MembershipTx for DirectoryTx {
    async fn lock_organization(&mut self, org: OrganizationId) -> StoreResult<Option<Organization>> {
        Ok(self.work.organizations.get(&org).cloned())
    }

    async fn find_active_membership(
        &mut self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .work
            .memberships
            .values()
            .find(|m| m.user_id == user && m.organization_id == org && m.is_active)
            .cloned())
    }

    async fn find_membership(
        &mut self,
        id: MembershipId,
        org: OrganizationId,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .work
            .memberships
            .get(&id)
            .filter(|m| m.organization_id == org)
            .cloned())
    }

    async fn count_active_admins_excluding(
        &mut self,
        org: OrganizationId,
        exclude: MembershipId,
    ) -> StoreResult<u64> {
        let n = self
            .work
            .memberships
            .values()
            .filter(|m| m.organization_id == org && m.id != exclude && m.is_active_admin())
            .count();
        Ok(n as u64)
    }

    async fn membership_exists(&mut self, user: UserId, org: OrganizationId) -> StoreResult<bool> {
        Ok(self
            .work
            .memberships
            .values()
            .any(|m| m.user_id == user && m.organization_id == org))
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        self.work.put_membership(membership, false)
    }

    async fn save_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        self.work.put_membership(membership, true)
    }

    async fn insert_organization(&mut self, organization: &Organization) -> StoreResult<()> {
        self.work.put_organization(organization, false)
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> StoreResult<(User, bool)> {
        if let Some(existing) = self.work.user_by_email(&user.email) {
            return Ok((existing.clone(), false));
        }
        self.work.put_user(user, false)?;
        Ok((user.clone(), true))
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        self.work.put_user(user, true)
    }

    async fn get_user(&mut self, id: UserId) -> StoreResult<User> {
        self.work.users.get(&id).cloned().ok_or(StoreError::NotFound("user"))
    }

    async fn lock_settings(&mut self) -> StoreResult<SiteSettings> {
        Ok(self.work.settings.clone().unwrap_or_default())
    }

    async fn save_settings(&mut self, settings: &SiteSettings) -> StoreResult<()> {
        self.work.settings = Some(settings.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let DirectoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
