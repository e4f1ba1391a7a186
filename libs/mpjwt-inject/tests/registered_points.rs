#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Tests for injection points registered through `inventory`.
//!
//! These tests verify that:
//! 1. Statically submitted points are discovered at bootstrap
//! 2. Per-request values follow the token of the request being served
//! 3. Providers stored outside the request read the current request's token

use std::sync::Arc;

use mpjwt_inject::{
    ClaimBinding, ClaimProvider, ClaimValue, InjectionPoint, JsonKind, Scope, TypeDescriptor,
    ValueType, bootstrap_registered,
};
use mpjwt_security::{Claims, JsonWebToken, TokenHolder};
use serde_json::json;

const STRING: TypeDescriptor = TypeDescriptor::Value(ValueType::String);
const STRING_SET: TypeDescriptor = TypeDescriptor::Value(ValueType::StringSet);

inventory::submit! {
    InjectionPoint::new(
        "Profile::issuer",
        ClaimBinding::standard(Claims::Iss),
        TypeDescriptor::ClaimValue(&STRING),
        Scope::Application,
    )
}

inventory::submit! {
    InjectionPoint::new(
        "Profile::groups",
        ClaimBinding::standard(Claims::Groups),
        TypeDescriptor::Provider(&STRING_SET),
        Scope::Application,
    )
}

inventory::submit! {
    InjectionPoint::new(
        "Handler::address",
        ClaimBinding::named("address"),
        TypeDescriptor::Json(JsonKind::Object),
        Scope::Request,
    )
}

fn token(iss: &str, groups: &[&str]) -> Arc<JsonWebToken> {
    let payload = json!({
        "iss": iss,
        "sub": "24400320",
        "groups": groups,
        "address": {"locality": "Anytown"},
    });
    Arc::new(JsonWebToken::from_json_claims(
        "raw",
        payload.as_object().unwrap(),
    ))
}

#[test]
fn registered_points_are_collected() {
    let registry = bootstrap_registered().unwrap();
    assert_eq!(registry.len(), 3);
    assert!(registry.producer_for("Profile::issuer").is_some());
    assert!(registry.producer_for("Handler::address").is_some());
}

#[tokio::test]
async fn values_follow_the_request_being_served() {
    let registry = Arc::new(bootstrap_registered().unwrap());

    for iss in ["https://one.example", "https://two.example"] {
        let registry = Arc::clone(&registry);
        let seen = TokenHolder::scope(async move {
            TokenHolder::set(token(iss, &["Echoer"])).unwrap();
            let issuer: ClaimValue<String> = registry.inject_as("Profile::issuer").unwrap();
            assert_eq!(issuer.name(), "iss");
            issuer.into_value()
        })
        .await;
        assert_eq!(seen, iss);
    }
}

#[tokio::test]
async fn stored_provider_reads_current_request() {
    let registry = bootstrap_registered().unwrap();
    let provider: ClaimProvider = TokenHolder::scope(async {
        TokenHolder::set(token("https://one.example", &["Echoer"])).unwrap();
        registry.inject_as("Profile::groups").unwrap()
    })
    .await;

    let groups = TokenHolder::scope(async {
        TokenHolder::set(token("https://one.example", &["Tester", "group1"])).unwrap();
        provider.get_as::<std::collections::BTreeSet<String>>().unwrap()
    })
    .await;
    assert_eq!(
        groups.into_iter().collect::<Vec<_>>(),
        vec!["Tester".to_owned(), "group1".to_owned()]
    );

    let anonymous = TokenHolder::scope(async { provider.get() }).await;
    assert!(anonymous.is_null());
}

#[test]
fn json_object_claim_is_injected() {
    let registry = bootstrap_registered().unwrap();
    let address: serde_json::Value = TokenHolder::sync_scope(|| {
        TokenHolder::set(token("https://one.example", &[])).unwrap();
        registry.inject_as("Handler::address").unwrap()
    });
    assert_eq!(address["locality"], "Anytown");
}
