//! In-process backend for tests and local runs.
//!
//! Users, organizations, memberships and site settings share one async mutex
//! so that a membership transaction sees and commits a consistent snapshot.
//! Items are an independent keyed store behind an `RwLock`.

mod directory;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use orgdesk_accounts::{User, UserStore};
use orgdesk_catalog::{Item, ItemStore};
use orgdesk_core::{Email, ItemId, OrganizationId, StoreError, StoreResult, UserId};
use orgdesk_crud::{ListQuery, RecordSource, Row, SourceError, memory::evaluate};
use orgdesk_orgs::{
    Membership, MembershipStore, MembershipTx, Organization, OrganizationAccess, SettingsStore,
    SiteSettings,
};

use directory::SharedDirectory;

fn poisoned(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} lock poisoned"))
}

/// Every store port and listing source, in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    directory: SharedDirectory,
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user outside any membership transaction.
    pub async fn add_user(&self, user: &User) -> StoreResult<()> {
        self.directory.insert_user(user).await
    }

    pub async fn add_organization(&self, organization: &Organization) -> StoreResult<()> {
        self.directory.insert_organization(organization).await
    }

    /// Replace an existing organization (e.g. to deactivate it).
    pub async fn save_organization(&self, organization: &Organization) -> StoreResult<()> {
        self.directory.save_organization(organization).await
    }

    pub async fn add_membership(&self, membership: &Membership) -> StoreResult<()> {
        self.directory.insert_membership(membership).await
    }

    /// Listing source for `catalog.items`.
    pub fn item_rows(&self) -> ItemRows {
        ItemRows {
            items: self.items.clone(),
        }
    }

    /// Listing source for `admin.users`.
    pub fn user_rows(&self) -> UserRows {
        UserRows {
            directory: self.directory.clone(),
        }
    }

    /// Member rows of every organization; queries scope them by `organization_id`.
    pub fn member_rows(&self) -> MemberRows {
        MemberRows {
            directory: self.directory.clone(),
        }
    }
}

#[async_trait]
impl ItemStore for MemoryBackend {
    async fn create(&self, item: Item) -> StoreResult<()> {
        let mut items = self.items.write().map_err(|_| poisoned("items"))?;
        if items.contains_key(&item.id) {
            return Err(StoreError::Conflict(format!("item {} already exists", item.id)));
        }
        items.insert(item.id, item);
        Ok(())
    }

    async fn get(&self, id: ItemId) -> StoreResult<Item> {
        let items = self.items.read().map_err(|_| poisoned("items"))?;
        items.get(&id).cloned().ok_or(StoreError::NotFound("item"))
    }

    async fn update(&self, item: Item) -> StoreResult<()> {
        let mut items = self.items.write().map_err(|_| poisoned("items"))?;
        match items.get_mut(&item.id) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(StoreError::NotFound("item")),
        }
    }

    async fn delete(&self, id: ItemId) -> StoreResult<()> {
        let mut items = self.items.write().map_err(|_| poisoned("items"))?;
        items.remove(&id).map(|_| ()).ok_or(StoreError::NotFound("item"))
    }
}

#[async_trait]
impl SettingsStore for MemoryBackend {
    async fn load(&self) -> StoreResult<SiteSettings> {
        Ok(self.directory.settings().await)
    }

    async fn save(&self, settings: &SiteSettings) -> StoreResult<()> {
        self.directory.save_settings(settings).await
    }
}

#[async_trait]
impl UserStore for MemoryBackend {
    async fn get(&self, id: UserId) -> StoreResult<User> {
        UserStore::get(&self.directory, id).await
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        self.directory.find_by_email(email).await
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.directory.find_by_username(username).await
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        UserStore::insert(&self.directory, user).await
    }

    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()> {
        self.directory.set_active(id, active).await
    }

    async fn save_profile(&self, user: &User) -> StoreResult<()> {
        self.directory.save_profile(user).await
    }

    async fn mark_verified(&self, id: UserId) -> StoreResult<()> {
        self.directory.mark_verified(id).await
    }
}

#[async_trait]
impl MembershipStore for MemoryBackend {
    async fn begin(&self) -> StoreResult<Box<dyn MembershipTx>> {
        self.directory.begin().await
    }

    async fn active_access(
        &self,
        user: UserId,
        org: OrganizationId,
    ) -> StoreResult<Option<OrganizationAccess>> {
        self.directory.active_access(user, org).await
    }

    async fn accesses_of(&self, user: UserId) -> StoreResult<Vec<OrganizationAccess>> {
        self.directory.accesses_of(user).await
    }
}

fn page(rows: Vec<Row>, query: &ListQuery, offset: u64, limit: u64) -> Vec<Row> {
    evaluate(rows, query)
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ItemRows {
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
}

impl ItemRows {
    fn snapshot(&self) -> Result<Vec<Row>, SourceError> {
        let items = self
            .items
            .read()
            .map_err(|_| SourceError::Backend("items lock poisoned".into()))?;
        Ok(items.values().map(Item::to_row).collect())
    }
}

#[async_trait]
impl RecordSource for ItemRows {
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        Ok(evaluate(self.snapshot()?, query).len() as u64)
    }

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
        Ok(page(self.snapshot()?, query, offset, limit))
    }
}

#[derive(Debug, Clone)]
pub struct UserRows {
    directory: SharedDirectory,
}

#[async_trait]
impl RecordSource for UserRows {
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        let rows = self.directory.read(|d| d.user_rows()).await;
        Ok(evaluate(rows, query).len() as u64)
    }

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
        let rows = self.directory.read(|d| d.user_rows()).await;
        Ok(page(rows, query, offset, limit))
    }
}

#[derive(Debug, Clone)]
pub struct MemberRows {
    directory: SharedDirectory,
}

#[async_trait]
impl RecordSource for MemberRows {
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        let rows = self.directory.read(|d| d.member_rows()).await;
        Ok(evaluate(rows, query).len() as u64)
    }

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
        let rows = self.directory.read(|d| d.member_rows()).await;
        Ok(page(rows, query, offset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orgdesk_catalog::{ItemInput, ItemStatus};
    use orgdesk_core::Slug;
    use orgdesk_crud::Value;
    use orgdesk_orgs::MembershipRole;

    fn user(email: &str) -> User {
        User::invited(Email::parse(email).unwrap(), "", "", Utc::now())
    }

    fn organization(slug: &str) -> Organization {
        Organization::new(slug, Slug::parse(slug).unwrap(), Utc::now())
    }

    #[tokio::test]
    async fn duplicate_email_and_slug_conflict() {
        let backend = MemoryBackend::new();
        backend.add_user(&user("a@example.com")).await.unwrap();
        assert!(matches!(
            backend.add_user(&user("a@example.com")).await,
            Err(StoreError::Conflict(_))
        ));

        backend.add_organization(&organization("acme")).await.unwrap();
        assert!(matches!(
            backend.add_organization(&organization("acme")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn profile_saves_keep_addresses_unique() {
        let backend = MemoryBackend::new();
        backend.add_user(&user("a@example.com")).await.unwrap();
        let mut b = user("b@example.com");
        b.is_staff = true;
        UserStore::insert(&backend, &b).await.unwrap();

        b.email = Email::parse("a@example.com").unwrap();
        assert!(matches!(backend.save_profile(&b).await, Err(StoreError::Conflict(_))));

        b.email = Email::parse("b2@example.com").unwrap();
        b.first_name = "Bea".into();
        b.is_staff = false;
        backend.save_profile(&b).await.unwrap();
        let stored = UserStore::get(&backend, b.id).await.unwrap();
        assert_eq!(stored.email.as_str(), "b2@example.com");
        assert_eq!(stored.first_name, "Bea");
        assert!(stored.is_staff, "profile saves leave flags alone");
        assert!(backend.find_by_username("b@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn verifying_activates_the_account() {
        let backend = MemoryBackend::new();
        let mut u = user("a@example.com");
        u.is_active = false;
        UserStore::insert(&backend, &u).await.unwrap();

        backend.mark_verified(u.id).await.unwrap();
        let stored = UserStore::get(&backend, u.id).await.unwrap();
        assert!(stored.is_active && stored.email_verified);
    }

    #[tokio::test]
    async fn dropped_transaction_discards_its_writes() {
        let backend = MemoryBackend::new();
        let u = user("a@example.com");
        let org = organization("acme");
        backend.add_user(&u).await.unwrap();
        backend.add_organization(&org).await.unwrap();

        {
            let mut tx = backend.begin().await.unwrap();
            let m = Membership::new(u.id, org.id, MembershipRole::Admin, Utc::now());
            tx.insert_membership(&m).await.unwrap();
        }
        assert!(backend.accesses_of(u.id).await.unwrap().is_empty());

        let mut tx = backend.begin().await.unwrap();
        let m = Membership::new(u.id, org.id, MembershipRole::Admin, Utc::now());
        tx.insert_membership(&m).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(backend.accesses_of(u.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_organizations_grant_no_access() {
        let backend = MemoryBackend::new();
        let u = user("a@example.com");
        let mut org = organization("acme");
        backend.add_user(&u).await.unwrap();
        backend.add_organization(&org).await.unwrap();
        backend
            .add_membership(&Membership::new(u.id, org.id, MembershipRole::Member, Utc::now()))
            .await
            .unwrap();
        assert!(backend.active_access(u.id, org.id).await.unwrap().is_some());

        org.is_active = false;
        backend.save_organization(&org).await.unwrap();
        assert!(backend.active_access(u.id, org.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn item_rows_follow_the_store() {
        let backend = MemoryBackend::new();
        let input = |name: &str| ItemInput {
            name: name.into(),
            status: ItemStatus::Active,
        };
        let first = Item::new(input("Widget"), Utc::now());
        backend.create(first.clone()).await.unwrap();
        backend.create(Item::new(input("Gadget"), Utc::now())).await.unwrap();

        let rows = backend.item_rows();
        let q = ListQuery::new().eq("name", "Widget");
        assert_eq!(rows.count(&q).await.unwrap(), 1);

        ItemStore::delete(&backend, first.id).await.unwrap();
        assert_eq!(rows.count(&q).await.unwrap(), 0);
        assert_eq!(
            rows.fetch(&ListQuery::new(), 0, 10).await.unwrap()[0].get("name"),
            &Value::from("Gadget")
        );
    }

    #[tokio::test]
    async fn insert_user_if_absent_hands_back_the_existing_row() {
        let backend = MemoryBackend::new();
        let first = user("a@example.com");
        backend.add_user(&first).await.unwrap();

        let mut tx = backend.begin().await.unwrap();
        let (stored, created) = tx.insert_user_if_absent(&user("a@example.com")).await.unwrap();
        assert!(!created);
        assert_eq!(stored.id, first.id);

        let (fresh, created) = tx.insert_user_if_absent(&user("b@example.com")).await.unwrap();
        assert!(created);
        tx.commit().await.unwrap();
        assert_eq!(UserStore::get(&backend, fresh.id).await.unwrap().email, fresh.email);
    }

    #[tokio::test]
    async fn settings_saved_in_a_transaction_commit_with_it() {
        let backend = MemoryBackend::new();
        {
            let mut tx = backend.begin().await.unwrap();
            let mut settings = tx.lock_settings().await.unwrap();
            settings.site_name = "Dropped".into();
            tx.save_settings(&settings).await.unwrap();
        }
        assert_eq!(backend.load().await.unwrap(), SiteSettings::default());

        let mut tx = backend.begin().await.unwrap();
        let mut settings = tx.lock_settings().await.unwrap();
        settings.setup_complete = true;
        tx.save_settings(&settings).await.unwrap();
        tx.commit().await.unwrap();
        assert!(backend.load().await.unwrap().setup_complete);
    }

    #[tokio::test]
    async fn settings_default_until_saved() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load().await.unwrap(), SiteSettings::default());
        let next = SiteSettings {
            site_name: "Acme".into(),
            ..SiteSettings::default()
        };
        backend.save(&next).await.unwrap();
        assert_eq!(backend.load().await.unwrap().site_name, "Acme");
    }
}
