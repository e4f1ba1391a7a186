//! The MP-JWT authentication mechanism.
//!
//! Reads the bearer token from the `Authorization` header, validates it,
//! materializes the caller's principals and roles, and publishes the token
//! into the request-scoped [`TokenHolder`].

use std::panic::{self, AssertUnwindSafe};
use std::str::Utf8Error;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use mpjwt_security::{RoleMapping, SecurityContext, TokenHolder};

use crate::config::{AuthContext, ConfigError, JwtAuthConfig};
use crate::problem::Problem;
use crate::validator::{Rs256TokenValidator, TokenValidator};

const BEARER_PREFIX: &str = "bearer ";
const CHALLENGE: &str = "Bearer {token}";

/// Result of running the mechanism on one request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(Box<SecurityContext>),
    /// A bearer token was present but rejected.
    NotAuthenticated,
    /// No bearer token was offered.
    NotAttempted,
}

#[derive(Clone)]
pub struct JwtAuthMechanism {
    ctx: Arc<AuthContext>,
    validator: Arc<dyn TokenValidator>,
    role_mapping: RoleMapping,
}

impl JwtAuthMechanism {
    #[must_use]
    pub fn new(ctx: AuthContext, validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            validator,
            role_mapping: RoleMapping::default(),
        }
    }

    #[must_use]
    pub fn with_role_mapping(mut self, role_mapping: RoleMapping) -> Self {
        self.role_mapping = role_mapping;
        self
    }

    /// Build the mechanism with the RS256 validator from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the issuer or signer key cannot be resolved.
    pub fn from_config(config: &JwtAuthConfig) -> Result<Self, ConfigError> {
        let ctx = AuthContext::from_config(config)?;
        tracing::info!("MP-JWT authentication enabled for issuer {}", ctx.issuer());
        Ok(Self::new(ctx, Arc::new(Rs256TokenValidator))
            .with_role_mapping(RoleMapping::new(config.role_mappings.clone())))
    }

    #[must_use]
    pub fn auth_context(&self) -> &AuthContext {
        &self.ctx
    }

    /// Authenticate a request from its headers.
    ///
    /// On success the token is published into [`TokenHolder`]; outside a
    /// request scope that step is skipped and logged.
    #[must_use]
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let token = match extract_bearer_token(headers) {
            None => return AuthOutcome::NotAttempted,
            Some(Ok(token)) => token,
            Some(Err(err)) => {
                tracing::debug!("Bearer token rejected: not valid UTF-8 ({err})");
                return AuthOutcome::NotAuthenticated;
            }
        };

        let validated = panic::catch_unwind(AssertUnwindSafe(|| {
            self.validator.validate(token, &self.ctx)
        }));
        let jwt = match validated {
            Ok(Ok(jwt)) => Arc::new(jwt),
            Ok(Err(err)) => {
                tracing::debug!("Bearer token rejected: {err}");
                return AuthOutcome::NotAuthenticated;
            }
            Err(_) => {
                tracing::error!("Token validator panicked; treating request as unauthenticated");
                return AuthOutcome::NotAuthenticated;
            }
        };

        if let Err(err) = TokenHolder::set(Arc::clone(&jwt)) {
            tracing::debug!("Token not published: {err}");
        }

        let context = SecurityContext::builder(jwt)
            .role_mapping(self.role_mapping.clone())
            .auth_scheme(SecurityContext::MP_JWT)
            .build();
        tracing::debug!(
            "Authenticated {} with roles {:?}",
            context.user_principal_name(),
            context.identity().roles()
        );
        AuthOutcome::Authenticated(Box::new(context))
    }

    /// Add the bearer challenge to `headers` and return the status to send.
    #[allow(clippy::unused_self)]
    pub fn send_challenge(&self, headers: &mut HeaderMap) -> StatusCode {
        append_challenge(headers);
        StatusCode::UNAUTHORIZED
    }

    /// Complete 401 response carrying the challenge.
    #[must_use]
    pub fn challenge_response(&self) -> Response {
        let mut response = Problem::unauthorized().into_response();
        let status = self.send_challenge(response.headers_mut());
        *response.status_mut() = status;
        response
    }
}

impl std::fmt::Debug for JwtAuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthMechanism")
            .field("ctx", &self.ctx)
            .field("role_mapping", &self.role_mapping)
            .finish_non_exhaustive()
    }
}

pub(crate) fn append_challenge(headers: &mut HeaderMap) {
    headers.append(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
}

/// Token from the first `Authorization` value using the bearer scheme.
///
/// The scheme is matched case-insensitively on the raw bytes, so a first
/// bearer value that is not UTF-8 is returned as an error instead of being
/// skipped. Later bearer values are ignored.
fn extract_bearer_token(headers: &HeaderMap) -> Option<Result<&str, Utf8Error>> {
    headers
        .get_all(header::AUTHORIZATION)
        .iter()
        .find_map(|value| {
            let bytes = value.as_bytes();
            bytes
                .get(..BEARER_PREFIX.len())
                .filter(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX.as_bytes()))
                .and_then(|_| bytes.get(BEARER_PREFIX.len()..))
        })
        .map(|token| std::str::from_utf8(token).map(str::trim))
}
