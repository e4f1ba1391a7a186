//! The validated bearer token.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::claims::Claims;
use crate::data::ClaimData;

/// Claim holding application roles in addition to `groups`.
pub const ROLES_CLAIM: &str = "roles";

/// A bearer token that passed validation.
///
/// Holds the claim set lifted into [`ClaimData`] and the original compact
/// serialization. The compact token is kept as a secret so that `Debug`
/// output never contains it; it is still served as the `raw_token` claim.
#[derive(Clone)]
pub struct JsonWebToken {
    name: String,
    claims: BTreeMap<String, ClaimData>,
    raw_token: SecretString,
}

impl JsonWebToken {
    /// Build a token from an already-converted claim map.
    ///
    /// A `raw_token` entry in `claims` is ignored in favor of `raw_token`.
    #[must_use]
    pub fn new(raw_token: impl Into<String>, mut claims: BTreeMap<String, ClaimData>) -> Self {
        claims.remove(Claims::RawToken.name());
        let name = resolve_name(&claims).unwrap_or_default();
        Self {
            name,
            claims,
            raw_token: SecretString::from(raw_token.into()),
        }
    }

    /// Build a token from the decoded JSON payload.
    #[must_use]
    pub fn from_json_claims(raw_token: impl Into<String>, payload: &Map<String, Value>) -> Self {
        let claims = payload
            .iter()
            .filter_map(|(name, value)| {
                let hint = Claims::from_name(name).map(Claims::claim_type);
                ClaimData::from_json(value, hint).map(|data| (name.clone(), data))
            })
            .collect();
        Self::new(raw_token, claims)
    }

    /// Unique principal name, resolved as `upn`, then `preferred_username`, then `sub`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a claim by name. `raw_token` is always present.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<ClaimData> {
        if name == Claims::RawToken.name() {
            return Some(ClaimData::String(
                self.raw_token.expose_secret().to_owned(),
            ));
        }
        self.claims.get(name).cloned()
    }

    /// Borrowing lookup for claims held in the payload.
    #[must_use]
    pub fn claim_ref(&self, name: &str) -> Option<&ClaimData> {
        self.claims.get(name)
    }

    #[must_use]
    pub fn contains_claim(&self, name: &str) -> bool {
        name == Claims::RawToken.name() || self.claims.contains_key(name)
    }

    /// Names of all claims in the token, including `raw_token`.
    #[must_use]
    pub fn claim_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.claims.keys().cloned().collect();
        names.insert(Claims::RawToken.name().to_owned());
        names
    }

    #[must_use]
    pub fn raw_token(&self) -> &SecretString {
        &self.raw_token
    }

    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.string_claim(Claims::Iss)
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.string_claim(Claims::Sub)
    }

    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.string_claim(Claims::Jti)
    }

    #[must_use]
    pub fn audience(&self) -> BTreeSet<String> {
        self.set_claim(Claims::Aud.name())
    }

    #[must_use]
    pub fn expiration_time(&self) -> Option<i64> {
        self.long_claim(Claims::Exp)
    }

    #[must_use]
    pub fn issued_at_time(&self) -> Option<i64> {
        self.long_claim(Claims::Iat)
    }

    /// Group names granted by the `groups` claim.
    #[must_use]
    pub fn groups(&self) -> BTreeSet<String> {
        self.set_claim(Claims::Groups.name())
    }

    /// Role names: the `roles` claim together with `groups`.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        let mut roles = self.set_claim(ROLES_CLAIM);
        roles.extend(self.groups());
        roles
    }

    fn string_claim(&self, claim: Claims) -> Option<&str> {
        self.claims.get(claim.name()).and_then(ClaimData::as_str)
    }

    fn long_claim(&self, claim: Claims) -> Option<i64> {
        self.claims.get(claim.name()).and_then(ClaimData::as_i64)
    }

    fn set_claim(&self, name: &str) -> BTreeSet<String> {
        self.claims
            .get(name)
            .and_then(ClaimData::to_string_set)
            .unwrap_or_default()
    }
}

fn resolve_name(claims: &BTreeMap<String, ClaimData>) -> Option<String> {
    [Claims::Upn, Claims::PreferredUsername, Claims::Sub]
        .into_iter()
        .find_map(|claim| claims.get(claim.name()).and_then(ClaimData::as_str))
        .map(str::to_owned)
}

impl fmt::Debug for JsonWebToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWebToken")
            .field("name", &self.name)
            .field("claims", &self.claims)
            .field("raw_token", &self.raw_token)
            .finish()
    }
}
