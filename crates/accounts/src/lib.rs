//! `orgdesk-accounts`: user accounts.
//!
//! Credentials are external; this crate owns the account record, sign-up
//! with e-mail verification, the user's own profile, the activation policy
//! and the `admin.users` listing.

pub mod descriptor;
pub mod policy;
pub mod profile;
pub mod registration;
pub mod store;
pub mod user;

pub use descriptor::{USERS_SLUG, users_config};
pub use policy::{AccountError, ensure_can_toggle, toggle_user};
pub use profile::{ProfileForm, get_profile, update_profile};
pub use registration::{
    LogNotifier, Registration, RegistrationForm, VerificationNotifier, VerificationOutcome,
    register_user, verify_email,
};
pub use store::UserStore;
pub use user::User;
