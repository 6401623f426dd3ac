//! The last-admin invariant.

use crate::{ErrorCode, Membership, MembershipRole, ServiceError};

/// Reject a change that would leave the organization without an active admin.
///
/// `other_active_admins` counts active admins of the same organization,
/// excluding `current`.
pub fn guard_last_admin(
    current: &Membership,
    next_role: MembershipRole,
    next_active: bool,
    other_active_admins: u64,
) -> Result<(), ServiceError> {
    let loses_admin = current.is_active_admin() && (next_role != MembershipRole::Admin || !next_active);
    if loses_admin && other_active_admins == 0 {
        return Err(ServiceError::new(
            ErrorCode::LastAdminForbidden,
            "the organization must keep at least one active admin",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use orgdesk_core::{OrganizationId, UserId};
    use proptest::prelude::*;

    use super::*;

    fn membership(role: MembershipRole, active: bool) -> Membership {
        let mut m = Membership::new(UserId::new(), OrganizationId::new(), role, Utc::now());
        m.is_active = active;
        m
    }

    fn role() -> impl Strategy<Value = MembershipRole> {
        prop_oneof![Just(MembershipRole::Admin), Just(MembershipRole::Member)]
    }

    #[test]
    fn sole_admin_cannot_step_down() {
        let admin = membership(MembershipRole::Admin, true);
        let demote = guard_last_admin(&admin, MembershipRole::Member, true, 0);
        let deactivate = guard_last_admin(&admin, MembershipRole::Admin, false, 0);
        assert_eq!(demote.unwrap_err().code, ErrorCode::LastAdminForbidden);
        assert_eq!(deactivate.unwrap_err().code, ErrorCode::LastAdminForbidden);
        assert!(guard_last_admin(&admin, MembershipRole::Member, false, 1).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn rejects_exactly_when_the_last_active_admin_is_lost(
            current_role in role(),
            current_active in any::<bool>(),
            next_role in role(),
            next_active in any::<bool>(),
            others in 0u64..4,
        ) {
            let current = membership(current_role, current_active);
            let outcome = guard_last_admin(&current, next_role, next_active, others);

            let admins_after = others + u64::from(next_active && next_role == MembershipRole::Admin);
            let was_admin = current_active && current_role == MembershipRole::Admin;
            let expect_reject = was_admin && admins_after == 0;

            prop_assert_eq!(outcome.is_err(), expect_reject);
        }
    }
}
