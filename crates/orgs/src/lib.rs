//! `orgdesk-orgs`: organizations, memberships and site setup.
//!
//! Services here return [`ServiceResult`]: either a value or a non-empty list
//! of coded errors. Every mutating membership service runs in a single
//! [`MembershipTx`] and enforces the last-admin rule inside it.

pub mod context;
pub mod error;
pub mod members;
pub mod model;
pub mod rules;
pub mod settings;
pub mod setup;
pub mod store;
pub mod switching;

pub use error::{ErrorCode, ServiceError, ServiceErrors, ServiceResult};
pub use members::{
    CreatedMember, MemberExport, MemberFilter, MemberList, MemberUpdate, NewMember, create_member,
    export_members, list_members, member_row, toggle_member, update_member,
};
pub use model::{Membership, MembershipRole, Organization, OrganizationAccess};
pub use rules::guard_last_admin;
pub use settings::{
    SETTINGS_SLUG, SettingsError, SettingsForm, SettingsStore, SiteSettings, get_settings,
    settings_config, update_settings,
};
pub use setup::{SetupForm, SetupOutcome, complete_setup};
pub use store::{MembershipStore, MembershipTx};
pub use switching::{
    default_organization, my_organizations, resolve_active_organization, switch_organization,
};
