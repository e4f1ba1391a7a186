#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use axum::body::Body;
use axum::http::{Request, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, get_current_timestamp};
use mpjwt_auth::{AuthContext, JwtAuthMechanism, Rs256TokenValidator};
use serde_json::{Value, json};
use std::sync::Arc;

pub const ISSUER: &str = "https://server.example.com";
pub const SIGNER_PRIVATE_KEY: &str = include_str!("../keys/signer-private.pem");
pub const SIGNER_PUBLIC_KEY: &str = include_str!("../keys/signer-public.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../keys/other-private.pem");

pub fn now() -> i64 {
    i64::try_from(get_current_timestamp()).unwrap()
}

/// Claims of the canonical test caller, valid for five minutes.
pub fn claims(sub: &str, groups: &[&str]) -> Value {
    json!({
        "iss": ISSUER,
        "jti": format!("a-{sub}"),
        "sub": sub,
        "upn": format!("{sub}@example.com"),
        "preferred_username": sub,
        "aud": "s6BhdRkqt3",
        "exp": now() + 300,
        "iat": now(),
        "auth_time": now(),
        "groups": groups,
        "customString": "customStringValue",
        "customInteger": 123_456_789,
        "customDouble": 3.141_592_653_589_793,
        "customObject": {"my-service": {"roles": ["role-in-my-service"]}},
    })
}

pub fn sign_with(claims: &Value, private_key: &str) -> String {
    encode(
        &Header::new(Algorithm::RS256),
        claims,
        &EncodingKey::from_rsa_pem(private_key.as_bytes()).unwrap(),
    )
    .unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with(claims, SIGNER_PRIVATE_KEY)
}

pub fn mechanism() -> JwtAuthMechanism {
    let ctx = AuthContext::new(ISSUER, SIGNER_PUBLIC_KEY, 60).unwrap();
    JwtAuthMechanism::new(ctx, Arc::new(Rs256TokenValidator))
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
