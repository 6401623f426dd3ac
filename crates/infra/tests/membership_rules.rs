//! Membership services against the in-memory backend.

use std::sync::Arc;

use chrono::Utc;

use orgdesk_accounts::User;
use orgdesk_auth::Principal;
use orgdesk_core::{Email, Slug};
use orgdesk_crud::RecordSource;
use orgdesk_infra::MemoryBackend;
use orgdesk_orgs::{
    ErrorCode, MemberFilter, MemberUpdate, Membership, MembershipRole, MembershipStore, NewMember,
    Organization, create_member, list_members, my_organizations, resolve_active_organization,
    switch_organization, toggle_member, update_member,
};

struct Fixture {
    backend: Arc<MemoryBackend>,
    org: Organization,
}

impl Fixture {
    async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let org = Organization::new("Acme", Slug::parse("acme").unwrap(), Utc::now());
        backend.add_organization(&org).await.unwrap();
        Self { backend, org }
    }

    async fn user(&self, email: &str) -> User {
        let user = User::invited(Email::parse(email).unwrap(), "", "", Utc::now());
        self.backend.add_user(&user).await.unwrap();
        user
    }

    async fn member(&self, user: &User, role: MembershipRole) -> Membership {
        let membership = Membership::new(user.id, self.org.id, role, Utc::now());
        self.backend.add_membership(&membership).await.unwrap();
        membership
    }
}

fn actor(user: &User) -> Principal {
    Principal::new(user.id, user.roles())
}

#[tokio::test]
async fn two_admins_deactivating_both_stops_at_the_last_one() {
    let fx = Fixture::new().await;
    let a = fx.user("a@example.com").await;
    let b = fx.user("b@example.com").await;
    let ma = fx.member(&a, MembershipRole::Admin).await;
    let mb = fx.member(&b, MembershipRole::Admin).await;

    let by_b = actor(&b);
    let deactivated = toggle_member(&*fx.backend, Some(&by_b), fx.org.id, ma.id, false)
        .await
        .unwrap();
    assert!(!deactivated.is_active);

    let err = toggle_member(&*fx.backend, Some(&by_b), fx.org.id, mb.id, false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LastAdminForbidden);

    let access = fx.backend.active_access(b.id, fx.org.id).await.unwrap().unwrap();
    assert_eq!(access.membership.role, MembershipRole::Admin);
}

#[tokio::test]
async fn sole_admin_cannot_demote_themselves() {
    let fx = Fixture::new().await;
    let a = fx.user("a@example.com").await;
    let ma = fx.member(&a, MembershipRole::Admin).await;

    let update = MemberUpdate {
        first_name: "Ann".into(),
        last_name: String::new(),
        role: "member".into(),
        is_active: true,
    };
    let err = update_member(&*fx.backend, Some(&actor(&a)), fx.org.id, ma.id, &update)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LastAdminForbidden);

    // Nothing from the rejected update was committed.
    let user = orgdesk_accounts::UserStore::get(&*fx.backend, a.id).await.unwrap();
    assert_eq!(user.first_name, "");
}

#[tokio::test]
async fn members_cannot_manage_members() {
    let fx = Fixture::new().await;
    let admin = fx.user("admin@example.com").await;
    let plain = fx.user("plain@example.com").await;
    fx.member(&admin, MembershipRole::Admin).await;
    let mp = fx.member(&plain, MembershipRole::Member).await;

    let err = toggle_member(&*fx.backend, Some(&actor(&plain)), fx.org.id, mp.id, false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let err = toggle_member(&*fx.backend, None, fx.org.id, mp.id, false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_yield_one_membership() {
    let fx = Fixture::new().await;
    let admin = fx.user("admin@example.com").await;
    fx.member(&admin, MembershipRole::Admin).await;
    let principal = actor(&admin);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let backend = fx.backend.clone();
        let principal = principal.clone();
        let org = fx.org.id;
        handles.push(tokio::spawn(async move {
            let input = NewMember {
                email: "new@example.com".into(),
                role: "member".into(),
                ..NewMember::default()
            };
            create_member(&*backend, Some(&principal), org, &input, Utc::now()).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(errors) => assert_eq!(errors.code(), ErrorCode::AlreadyMember),
        }
    }
    assert_eq!(created, 1);

    let rows = fx.backend.member_rows();
    let query = MemberFilter::default().to_query(fx.org.id).unwrap();
    assert_eq!(rows.count(&query).await.unwrap(), 2);
}

#[tokio::test]
async fn inviting_a_known_address_reuses_the_user() {
    let fx = Fixture::new().await;
    let admin = fx.user("admin@example.com").await;
    fx.member(&admin, MembershipRole::Admin).await;
    let known = fx.user("known@example.com").await;

    let input = NewMember {
        email: "Known@Example.com".into(),
        first_name: "Kim".into(),
        role: "member".into(),
        ..NewMember::default()
    };
    let created = create_member(&*fx.backend, Some(&actor(&admin)), fx.org.id, &input, Utc::now())
        .await
        .unwrap();
    assert!(!created.created_user);
    assert_eq!(created.user_id, known.id);

    let rows = fx.backend.member_rows();
    let query = MemberFilter {
        q: "kim".into(),
        ..MemberFilter::default()
    }
    .to_query(fx.org.id)
    .unwrap();
    assert_eq!(rows.count(&query).await.unwrap(), 1);
}

#[tokio::test]
async fn listing_never_provisions_memberships() {
    let fx = Fixture::new().await;
    let admin = fx.user("admin@example.com").await;
    fx.member(&admin, MembershipRole::Admin).await;
    let outsider = fx.user("staff@example.com").await;

    let rows = fx.backend.member_rows();
    let err = list_members(
        &*fx.backend,
        &rows,
        Some(&actor(&outsider)),
        fx.org.id,
        &MemberFilter::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert!(fx.backend.accesses_of(outsider.id).await.unwrap().is_empty());

    let list = list_members(
        &*fx.backend,
        &rows,
        Some(&actor(&admin)),
        fx.org.id,
        &MemberFilter::default(),
    )
    .await
    .unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.members.len(), 1);
}

#[tokio::test]
async fn plain_members_cannot_list_members() {
    let fx = Fixture::new().await;
    let admin = fx.user("admin@example.com").await;
    fx.member(&admin, MembershipRole::Admin).await;
    let pat = fx.user("pat@example.com").await;
    fx.member(&pat, MembershipRole::Member).await;

    let rows = fx.backend.member_rows();
    let err = list_members(
        &*fx.backend,
        &rows,
        Some(&actor(&pat)),
        fx.org.id,
        &MemberFilter::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn switching_requires_active_membership_and_organization() {
    let fx = Fixture::new().await;
    let user = fx.user("a@example.com").await;
    let m = fx.member(&user, MembershipRole::Member).await;

    let other = Organization::new("Beta", Slug::parse("beta").unwrap(), Utc::now());
    fx.backend.add_organization(&other).await.unwrap();

    let principal = actor(&user);
    assert!(switch_organization(&*fx.backend, Some(&principal), fx.org.id).await.is_ok());
    let err = switch_organization(&*fx.backend, Some(&principal), other.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let listed = my_organizations(&*fx.backend, Some(&principal)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].membership.id, m.id);

    let mut inactive = fx.org.clone();
    inactive.is_active = false;
    fx.backend.save_organization(&inactive).await.unwrap();
    assert!(
        resolve_active_organization(&*fx.backend, user.id, Some(fx.org.id))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        resolve_active_organization(&*fx.backend, user.id, None)
            .await
            .unwrap()
            .is_none()
    );
}
