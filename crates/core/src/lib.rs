//! `orgdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model and a few validated value objects
//! shared by every other crate.

pub mod error;
pub mod form;
pub mod id;
pub mod store;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use form::FieldErrors;
pub use id::{ItemId, MembershipId, OrganizationId, UserId};
pub use store::{StoreError, StoreResult};
pub use value_object::{Email, HexColor, Slug};
