//! `orgdesk-auth`: pure authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it knows how to verify a
//! token, which permissions a global role grants, and whether a resolved
//! principal may do something. Membership lookups happen in the caller.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod verification;

pub use authorize::{AuthzError, authorize, authorize_any_role};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError};
pub use permissions::{Permission, permissions_for_roles};
pub use principal::{OrganizationMembership, Principal};
pub use roles::Role;
pub use verification::{EmailVerifier, VERIFICATION_TTL_HOURS, VerificationClaims};
