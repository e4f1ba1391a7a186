#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Claim injection for MP-JWT protected services.
//!
//! Components declare [`InjectionPoint`]s statically. At startup
//! [`bootstrap_registered`] (or [`bootstrap`] with an explicit list) validates
//! them and builds a [`ClaimProducerRegistry`]; per request the registry
//! resolves each site against the token published in
//! [`mpjwt_security::TokenHolder`].

pub mod binding;
pub mod collector;
pub mod error;
pub mod json;
pub mod registry;
pub mod shape;
pub mod value;

pub use binding::{ClaimBinding, InjectionPoint, JsonKind, Scope, TypeDescriptor, ValueType};
pub use collector::{
    ClaimBindingKey, ClaimBindingSite, MetadataCollector, collect, collect_registered,
};
pub use error::{ConfigError, InjectError};
pub use registry::{ClaimProducer, ClaimProducerRegistry};
pub use shape::{ClaimShape, Classified, classify};
pub use value::{ClaimProvider, ClaimValue, FromInjected, InjectedValue};

/// Validate `points` and build the producer registry.
///
/// # Errors
///
/// Returns a [`ConfigError`] for the first invalid injection point.
pub fn bootstrap<'a>(
    points: impl IntoIterator<Item = &'a InjectionPoint>,
) -> Result<ClaimProducerRegistry, ConfigError> {
    ClaimProducerRegistry::from_sites(collect(points)?)
}

/// Validate every `inventory`-registered injection point and build the registry.
///
/// # Errors
///
/// Returns a [`ConfigError`] for the first invalid injection point.
pub fn bootstrap_registered() -> Result<ClaimProducerRegistry, ConfigError> {
    ClaimProducerRegistry::from_sites(collect_registered()?)
}
