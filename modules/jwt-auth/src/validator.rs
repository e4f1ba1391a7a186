//! Bearer token verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use mpjwt_security::JsonWebToken;
use serde_json::{Map, Value};

use crate::config::AuthContext;

/// Why a token failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token issuer does not match")]
    IssuerMismatch,

    #[error("token algorithm is not supported")]
    UnsupportedAlgorithm,

    #[error("token is missing required claim '{0}'")]
    MissingClaim(String),

    #[error("token validation failed: {0}")]
    Other(String),
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                Self::Malformed(err.to_string())
            }
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidIssuer => Self::IssuerMismatch,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::UnsupportedAlgorithm,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Other(err.to_string()),
        }
    }
}

/// Verifies a compact bearer token and lifts its claims.
pub trait TokenValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first failed check.
    fn validate(&self, token: &str, ctx: &AuthContext) -> Result<JsonWebToken, ValidationError>;
}

/// RS256 validator backed by `jsonwebtoken`.
///
/// Requires `exp` and `iss`, checks the issuer against the configured one,
/// applies the grace period to `exp` and `nbf`, and ignores `aud`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rs256TokenValidator;

impl Rs256TokenValidator {
    fn validation(ctx: &AuthContext) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ctx.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.leeway = ctx.exp_grace_period_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation
    }
}

impl TokenValidator for Rs256TokenValidator {
    fn validate(&self, token: &str, ctx: &AuthContext) -> Result<JsonWebToken, ValidationError> {
        let data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            ctx.decoding_key(),
            &Self::validation(ctx),
        )?;
        Ok(JsonWebToken::from_json_claims(token, &data.claims))
    }
}
