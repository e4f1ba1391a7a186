//! Axum extractors for the authenticated caller and injected claims.

use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::request::Parts;
use mpjwt_inject::{ClaimProducerRegistry, FromInjected, InjectError, InjectedValue};
use mpjwt_security::{JsonWebToken, SecurityContext};

use crate::mechanism::append_challenge;
use crate::problem::Problem;

/// Why an extractor refused the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("no authenticated caller")]
    Unauthenticated,

    #[error("caller is not in role '{0}'")]
    Forbidden(&'static str),

    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                let mut response = Problem::unauthorized().into_response();
                append_challenge(response.headers_mut());
                response
            }
            Self::Forbidden(role) => Problem::forbidden(role).into_response(),
            Self::NotConfigured(what) => Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                format!("{what} not configured"),
            )
            .into_response(),
        }
    }
}

/// The authenticated caller. Rejects with a 401 challenge when absent.
#[derive(Debug, Clone)]
pub struct Caller(pub SecurityContext);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Caller)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// The validated token of the request, if any.
#[derive(Debug, Clone)]
pub struct CurrentToken(pub Option<Arc<JsonWebToken>>);

impl<S> FromRequestParts<S> for CurrentToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentToken(parts.extensions.get::<Arc<JsonWebToken>>().cloned()))
    }
}

/// Role name checked by [`RequireRole`].
pub trait RoleName: Send + Sync + 'static {
    const ROLE: &'static str;
}

/// The authenticated caller, required to be in role `R`.
///
/// Rejects with 401 when no caller is authenticated and 403 when the caller
/// lacks the role.
#[derive(Debug, Clone)]
pub struct RequireRole<R> {
    caller: SecurityContext,
    _role: PhantomData<R>,
}

impl<R: RoleName> RequireRole<R> {
    #[must_use]
    pub fn caller(&self) -> &SecurityContext {
        &self.caller
    }

    #[must_use]
    pub fn into_inner(self) -> SecurityContext {
        self.caller
    }
}

impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: Send + Sync,
    R: RoleName,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Caller(caller) = Caller::from_request_parts(parts, state).await?;
        if !caller.is_caller_in_role(R::ROLE) {
            tracing::debug!(
                "{} is not in role {}",
                caller.user_principal_name(),
                R::ROLE
            );
            return Err(AuthRejection::Forbidden(R::ROLE));
        }
        Ok(Self {
            caller,
            _role: PhantomData,
        })
    }
}

/// Claim injection bound to the current request's token.
#[derive(Debug, Clone)]
pub struct ClaimInjector {
    registry: Arc<ClaimProducerRegistry>,
    token: Option<Arc<JsonWebToken>>,
}

impl ClaimInjector {
    /// Produce the value for an injection site.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::UnknownSite`] when `location` was never collected.
    pub fn inject(&self, location: &str) -> Result<InjectedValue, InjectError> {
        self.registry.inject_from(location, self.token.as_deref())
    }

    /// Produce and convert the value for an injection site.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::UnknownSite`] for an unknown location, or the
    /// conversion error from [`FromInjected`].
    pub fn inject_as<T: FromInjected>(&self, location: &str) -> Result<T, InjectError> {
        self.inject(location).and_then(T::from_injected)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ClaimProducerRegistry> {
        &self.registry
    }
}

impl<S> FromRequestParts<S> for ClaimInjector
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let registry = parts
            .extensions
            .get::<Arc<ClaimProducerRegistry>>()
            .cloned()
            .ok_or(AuthRejection::NotConfigured("claim injection"))?;
        Ok(Self {
            registry,
            token: parts.extensions.get::<Arc<JsonWebToken>>().cloned(),
        })
    }
}
