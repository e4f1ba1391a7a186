#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Security model shared by the MP-JWT authentication mechanism and the
//! claim injection engine.
//!
//! - [`JsonWebToken`] - the validated token and its claims
//! - [`Claims`] - standard claim names and their fixed types
//! - [`CallerIdentity`] / [`materialize`] - principal and role-set derivation
//! - [`SecurityContext`] - the authenticated caller installed per request
//! - [`TokenHolder`] - request-scoped slot holding the current token

pub mod claims;
pub mod context;
pub mod data;
pub mod holder;
pub mod principal;
pub mod token;

pub use claims::{ClaimType, Claims, UnknownClaim};
pub use context::{SecurityContext, SecurityContextBuilder};
pub use data::ClaimData;
pub use holder::{HolderError, TokenHolder};
pub use principal::{
    CALLER_PRINCIPAL_GROUP, CallerIdentity, Principal, ROLES_GROUP, RoleMapping, materialize,
};
pub use token::{JsonWebToken, ROLES_CLAIM};
