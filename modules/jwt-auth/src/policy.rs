use std::sync::Arc;

use crate::config::{ConfigError, JwtAuthConfig};

/// Whether a route requires authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// No authentication required (public route).
    None,
    /// Authentication required.
    Required,
}

/// Decides which request paths need an authenticated caller.
#[derive(Clone)]
pub struct RoutePolicy {
    public: Arc<matchit::Router<()>>,
    require_auth_by_default: bool,
}

impl RoutePolicy {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRoute`] for a pattern `matchit` rejects.
    pub fn new<I, P>(require_auth_by_default: bool, public_routes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut public = matchit::Router::new();
        for route in public_routes {
            let route = route.as_ref();
            public
                .insert(route, ())
                .map_err(|e| ConfigError::InvalidRoute {
                    path: route.to_owned(),
                    reason: e.to_string(),
                })?;
        }
        Ok(Self {
            public: Arc::new(public),
            require_auth_by_default,
        })
    }

    /// # Errors
    ///
    /// See [`RoutePolicy::new`].
    pub fn from_config(config: &JwtAuthConfig) -> Result<Self, ConfigError> {
        Self::new(config.require_auth_by_default, &config.public_routes)
    }

    /// Resolve the authentication requirement for a request path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> AuthRequirement {
        // Public routes should not be forced to auth by default
        let is_public = self.public.at(path).is_ok();
        if self.require_auth_by_default && !is_public {
            AuthRequirement::Required
        } else {
            AuthRequirement::None
        }
    }
}

impl std::fmt::Debug for RoutePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutePolicy")
            .field("require_auth_by_default", &self.require_auth_by_default)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn public_patterns_are_exempt() {
        let policy = RoutePolicy::new(true, ["/endp/health", "/static/{*path}"]).unwrap();
        assert_eq!(policy.resolve("/endp/health"), AuthRequirement::None);
        assert_eq!(policy.resolve("/static/css/site.css"), AuthRequirement::None);
        assert_eq!(policy.resolve("/endp/echo"), AuthRequirement::Required);
    }

    #[test]
    fn everything_is_public_when_not_required_by_default() {
        let policy = RoutePolicy::new(false, Vec::<String>::new()).unwrap();
        assert_eq!(policy.resolve("/endp/echo"), AuthRequirement::None);
    }

    #[test]
    fn conflicting_patterns_are_rejected() {
        let err = RoutePolicy::new(true, ["/items/{id}", "/items/{name}"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoute { .. }));
    }
}
