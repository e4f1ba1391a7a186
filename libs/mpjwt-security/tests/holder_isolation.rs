#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Isolation tests for the request-scoped token holder.
//!
//! These tests verify that:
//! 1. Concurrent requests observe only their own token
//! 2. A cancelled request leaves nothing behind for the next one on the same worker

use std::sync::Arc;
use std::time::Duration;

use mpjwt_security::{JsonWebToken, TokenHolder};
use serde_json::json;
use tokio::sync::Barrier;

fn token(sub: &str) -> Arc<JsonWebToken> {
    let claims = json!({ "sub": sub });
    Arc::new(JsonWebToken::from_json_claims(
        format!("raw-{sub}"),
        claims.as_object().unwrap(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_see_their_own_token() {
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|sub| {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(TokenHolder::scope(async move {
                TokenHolder::set(token(sub)).unwrap();
                // Both requests hold a token at the same time past this point.
                barrier.wait().await;
                tokio::task::yield_now().await;
                TokenHolder::current().unwrap().name().to_owned()
            }))
        })
        .collect();

    let mut seen = Vec::new();
    for handle in handles {
        seen.push(handle.await.unwrap());
    }
    assert_eq!(seen, vec!["alice".to_owned(), "bob".to_owned()]);
}

#[tokio::test(flavor = "current_thread")]
async fn cancelled_request_does_not_leak_into_next() {
    let slow = TokenHolder::scope(async {
        TokenHolder::set(token("alice")).unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(10), slow).await;
    assert!(timed_out.is_err());

    let next = TokenHolder::scope(async { TokenHolder::current() }).await;
    assert!(next.is_none());
    assert!(TokenHolder::current().is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn sequential_requests_on_one_worker_do_not_leak() {
    TokenHolder::scope(async {
        TokenHolder::set(token("alice")).unwrap();
    })
    .await;

    let anonymous = TokenHolder::scope(async { TokenHolder::current() }).await;
    assert!(anonymous.is_none());
}
