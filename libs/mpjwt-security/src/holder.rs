//! Request-scoped holder for the current validated token.
//!
//! The slot lives in a tokio task-local that exists only while a request
//! future is being polled inside [`TokenHolder::scope`]. When that future
//! finishes, fails, panics, or is dropped mid-flight, the slot goes with it,
//! so a worker thread that picks up the next request starts from an empty
//! holder.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use crate::token::JsonWebToken;

tokio::task_local! {
    static CURRENT_TOKEN: RefCell<Option<Arc<JsonWebToken>>>;
}

/// Errors from writing to the holder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HolderError {
    #[error("no request scope is active")]
    NoRequestScope,
}

/// Access point for the per-request token slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenHolder;

impl TokenHolder {
    /// Run `fut` with a fresh, empty token slot.
    pub async fn scope<F>(fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TOKEN.scope(RefCell::new(None), fut).await
    }

    /// Run `f` synchronously with a fresh, empty token slot.
    pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
        CURRENT_TOKEN.sync_scope(RefCell::new(None), f)
    }

    /// Whether the caller is running inside a request scope.
    #[must_use]
    pub fn in_scope() -> bool {
        CURRENT_TOKEN.try_with(|_| ()).is_ok()
    }

    /// Publish the authenticated token for the current request.
    ///
    /// # Errors
    ///
    /// Returns [`HolderError::NoRequestScope`] when called outside
    /// [`TokenHolder::scope`] or [`TokenHolder::sync_scope`].
    pub fn set(token: Arc<JsonWebToken>) -> Result<(), HolderError> {
        CURRENT_TOKEN
            .try_with(|slot| {
                slot.replace(Some(token));
            })
            .map_err(|_| HolderError::NoRequestScope)
    }

    /// The token for the current request, if authentication ran and succeeded.
    #[must_use]
    pub fn current() -> Option<Arc<JsonWebToken>> {
        CURRENT_TOKEN
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// Empty the slot. A no-op outside a request scope.
    pub fn clear() {
        let _ = CURRENT_TOKEN.try_with(|slot| slot.replace(None));
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(sub: &str) -> Arc<JsonWebToken> {
        let claims = json!({ "sub": sub });
        Arc::new(JsonWebToken::from_json_claims("t", claims.as_object().unwrap()))
    }

    #[test]
    fn outside_scope_reads_empty_and_rejects_writes() {
        assert!(!TokenHolder::in_scope());
        assert!(TokenHolder::current().is_none());
        assert_eq!(
            TokenHolder::set(token("user1")),
            Err(HolderError::NoRequestScope)
        );
        TokenHolder::clear();
    }

    #[test]
    fn set_get_clear_within_scope() {
        TokenHolder::sync_scope(|| {
            assert!(TokenHolder::in_scope());
            assert!(TokenHolder::current().is_none());

            TokenHolder::set(token("user1")).unwrap();
            assert_eq!(TokenHolder::current().unwrap().name(), "user1");

            TokenHolder::clear();
            assert!(TokenHolder::current().is_none());
        });
    }

    #[test]
    fn consecutive_scopes_on_one_thread_do_not_leak() {
        TokenHolder::sync_scope(|| TokenHolder::set(token("user1")).unwrap());
        TokenHolder::sync_scope(|| assert!(TokenHolder::current().is_none()));
        assert!(TokenHolder::current().is_none());
    }

    #[test]
    fn panicking_request_does_not_leak() {
        let result = std::panic::catch_unwind(|| {
            TokenHolder::sync_scope(|| {
                TokenHolder::set(token("user1")).unwrap();
                panic!("handler failed");
            });
        });
        assert!(result.is_err());
        TokenHolder::sync_scope(|| assert!(TokenHolder::current().is_none()));
    }

    #[tokio::test]
    async fn async_scope_holds_token_across_awaits() {
        TokenHolder::scope(async {
            TokenHolder::set(token("user1")).unwrap();
            tokio::task::yield_now().await;
            assert_eq!(TokenHolder::current().unwrap().name(), "user1");
        })
        .await;
        assert!(TokenHolder::current().is_none());
    }
}
