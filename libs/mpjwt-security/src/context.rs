use std::sync::Arc;

use crate::principal::{CallerIdentity, RoleMapping, materialize};
use crate::token::JsonWebToken;

/// `SecurityContext` encapsulates the authenticated caller for one request.
///
/// Built by the authentication mechanism after a bearer token validates and
/// installed into the request so handlers and authorization checks can read
/// the caller principal, its roles, and the token itself.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    /// Principal set and roles derived from the token.
    identity: CallerIdentity,
    /// The validated token. Shared with the request-scoped token holder.
    token: Arc<JsonWebToken>,
    /// Authentication scheme that produced this context.
    auth_scheme: &'static str,
}

impl SecurityContext {
    /// Scheme name reported for MP-JWT bearer authentication.
    pub const MP_JWT: &'static str = "MP-JWT";

    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder(token: Arc<JsonWebToken>) -> SecurityContextBuilder {
        SecurityContextBuilder {
            token,
            role_mapping: None,
            auth_scheme: Self::MP_JWT,
        }
    }

    /// Get the caller identity
    #[must_use]
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Get the caller principal name
    #[must_use]
    pub fn user_principal_name(&self) -> &str {
        self.identity.name()
    }

    /// Get the validated token
    #[must_use]
    pub fn token(&self) -> &Arc<JsonWebToken> {
        &self.token
    }

    /// Get the authentication scheme
    #[must_use]
    pub fn auth_scheme(&self) -> &'static str {
        self.auth_scheme
    }

    /// Check whether the caller holds the given role.
    #[must_use]
    pub fn is_caller_in_role(&self, role: &str) -> bool {
        self.identity.is_in_role(role)
    }
}

pub struct SecurityContextBuilder {
    token: Arc<JsonWebToken>,
    role_mapping: Option<RoleMapping>,
    auth_scheme: &'static str,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn role_mapping(mut self, mapping: RoleMapping) -> Self {
        self.role_mapping = Some(mapping);
        self
    }

    #[must_use]
    pub fn auth_scheme(mut self, scheme: &'static str) -> Self {
        self.auth_scheme = scheme;
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        let mapping = self.role_mapping.unwrap_or_default();
        SecurityContext {
            identity: materialize(&self.token, &mapping),
            token: self.token,
            auth_scheme: self.auth_scheme,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    fn token() -> Arc<JsonWebToken> {
        let claims = json!({"sub": "user1", "groups": ["Echoer"]});
        Arc::new(JsonWebToken::from_json_claims(
            "test-token-123",
            claims.as_object().unwrap(),
        ))
    }

    #[test]
    fn test_security_context_builder_defaults() {
        let ctx = SecurityContext::builder(token()).build();

        assert_eq!(ctx.user_principal_name(), "user1");
        assert_eq!(ctx.auth_scheme(), "MP-JWT");
        assert!(ctx.is_caller_in_role("Echoer"));
        assert_eq!(
            ctx.token().raw_token().expose_secret(),
            "test-token-123"
        );
    }

    #[test]
    fn test_security_context_with_role_mapping() {
        let mapping = RoleMapping::new(HashMap::from([(
            "Echoer".to_owned(),
            vec!["Tester".to_owned()],
        )]));
        let ctx = SecurityContext::builder(token())
            .role_mapping(mapping)
            .build();

        assert!(ctx.is_caller_in_role("Tester"));
    }

    #[test]
    fn test_security_context_shares_token() {
        let token = token();
        let ctx = SecurityContext::builder(Arc::clone(&token)).build();
        let ctx2 = ctx.clone();

        assert!(Arc::ptr_eq(ctx.token(), &token));
        assert!(Arc::ptr_eq(ctx2.token(), &token));
    }

    #[test]
    fn test_security_context_debug_redacts_token() {
        let ctx = SecurityContext::builder(token()).build();
        assert!(!format!("{ctx:?}").contains("test-token-123"));
    }
}
