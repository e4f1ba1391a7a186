//! Tower layer installing the MP-JWT mechanism in front of a router.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http::{HeaderMap, Method, header};
use mpjwt_inject::ClaimProducerRegistry;
use mpjwt_security::TokenHolder;
use tower::{Layer, Service};

use crate::mechanism::{AuthOutcome, JwtAuthMechanism};
use crate::policy::{AuthRequirement, RoutePolicy};

struct JwtAuthState {
    mechanism: JwtAuthMechanism,
    policy: RoutePolicy,
    registry: Option<Arc<ClaimProducerRegistry>>,
}

/// Layer that authenticates every request with [`JwtAuthMechanism`].
///
/// Each request runs inside its own [`TokenHolder`] scope, so the published
/// token is gone once the response future completes or is dropped.
///
/// # Example
/// ```ignore
/// router = router.layer(JwtAuthLayer::new(mechanism, policy).with_registry(registry));
/// ```
#[derive(Clone)]
pub struct JwtAuthLayer {
    state: Arc<JwtAuthState>,
}

impl JwtAuthLayer {
    #[must_use]
    pub fn new(mechanism: JwtAuthMechanism, policy: RoutePolicy) -> Self {
        Self {
            state: Arc::new(JwtAuthState {
                mechanism,
                policy,
                registry: None,
            }),
        }
    }

    /// Make claim producers available to handlers through the `ClaimInjector` extractor.
    #[must_use]
    pub fn with_registry(self, registry: Arc<ClaimProducerRegistry>) -> Self {
        Self {
            state: Arc::new(JwtAuthState {
                mechanism: self.state.mechanism.clone(),
                policy: self.state.policy.clone(),
                registry: Some(registry),
            }),
        }
    }
}

impl<S> Layer<S> for JwtAuthLayer {
    type Service = JwtAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtAuthService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Clone)]
pub struct JwtAuthService<S> {
    inner: S,
    state: Arc<JwtAuthState>,
}

impl<S> Service<Request<Body>> for JwtAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(TokenHolder::scope(async move {
            if let Some(registry) = &state.registry {
                request.extensions_mut().insert(Arc::clone(registry));
            }

            if is_preflight_request(request.method(), request.headers()) {
                return ready_inner.call(request).await;
            }

            let requirement = state.policy.resolve(request.uri().path());
            match state.mechanism.authenticate(request.headers()) {
                AuthOutcome::Authenticated(context) => {
                    request.extensions_mut().insert(Arc::clone(context.token()));
                    request.extensions_mut().insert(*context);
                    ready_inner.call(request).await
                }
                outcome if requirement == AuthRequirement::Required => {
                    tracing::debug!(
                        "Challenging {} {}: {outcome:?}",
                        request.method(),
                        request.uri().path()
                    );
                    Ok(state.mechanism.challenge_response())
                }
                _ => ready_inner.call(request).await,
            }
        }))
    }
}

/// Check if this is a CORS preflight request
///
/// Preflight requests are OPTIONS requests with:
/// - Origin header present
/// - Access-Control-Request-Method header present
fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(header::ORIGIN)
        && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
