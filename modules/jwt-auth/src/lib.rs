#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! MP-JWT bearer authentication for axum services.
//!
//! Build a [`JwtAuthMechanism`] from [`JwtAuthConfig`], wrap the router in a
//! [`JwtAuthLayer`], and read the caller in handlers through [`Caller`],
//! [`RequireRole`], [`CurrentToken`] or [`ClaimInjector`].

pub mod config;
pub mod extract;
pub mod layer;
pub mod mechanism;
pub mod policy;
pub mod problem;
pub mod validator;

pub use config::{AuthContext, ConfigError, JwtAuthConfig};
pub use extract::{AuthRejection, Caller, ClaimInjector, CurrentToken, RequireRole, RoleName};
pub use layer::{JwtAuthLayer, JwtAuthService};
pub use mechanism::{AuthOutcome, JwtAuthMechanism};
pub use policy::{AuthRequirement, RoutePolicy};
pub use problem::Problem;
pub use validator::{Rs256TokenValidator, TokenValidator, ValidationError};
