use mpjwt_security::ClaimType;
use thiserror::Error;

use crate::binding::{Scope, TypeDescriptor};

/// Deployment-time configuration errors. Any of these aborts startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("claim binding at '{location}' names no claim")]
    MissingClaimName { location: &'static str },

    #[error("'{location}' declares unsupported injection type {declared}")]
    UnsupportedType {
        location: &'static str,
        declared: TypeDescriptor,
    },

    #[error("'{location}' declares {declared} for claim '{claim}' of type {expected:?}")]
    TypeMismatch {
        location: &'static str,
        claim: &'static str,
        expected: ClaimType,
        declared: TypeDescriptor,
    },

    #[error(
        "'{location}' injects claim '{claim}' as {declared} into a {scope}-scoped component; use ClaimValue or Provider"
    )]
    ScopeViolation {
        location: &'static str,
        claim: &'static str,
        scope: Scope,
        declared: TypeDescriptor,
    },

    #[error("injection point '{location}' is declared more than once")]
    DuplicateSite { location: &'static str },

    #[error("a producer for claim '{claim}' as {declared} is already registered")]
    DuplicateProducer {
        claim: &'static str,
        declared: TypeDescriptor,
    },
}

/// Errors resolving a value for an injection point at request time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("no claim binding is registered for '{0}'")]
    UnknownSite(String),

    #[error("injected claim value is absent")]
    Absent,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
