//! The `/endp` roles endpoint.
//!
//! An application-wide component with claims injected as `ClaimValue` and
//! `Provider` wrappers, plus role-protected echo routes.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use mpjwt_auth::{Caller, ClaimInjector, RequireRole, RoleName};
use mpjwt_inject::{
    ClaimBinding, ClaimProducerRegistry, ClaimProvider, ClaimValue, FromInjected, InjectError,
    InjectionPoint, Scope, TypeDescriptor, ValueType,
};
use mpjwt_security::Claims;
use serde::Deserialize;
use serde_json::{Map, Value, json};

const STRING: TypeDescriptor = TypeDescriptor::Value(ValueType::String);
const LONG: TypeDescriptor = TypeDescriptor::Value(ValueType::Long);
const STRING_SET: TypeDescriptor = TypeDescriptor::Value(ValueType::StringSet);
const ANY: TypeDescriptor = TypeDescriptor::Value(ValueType::Any);
const OPT_STRING: TypeDescriptor = TypeDescriptor::Optional(&STRING);
const OPT_LONG: TypeDescriptor = TypeDescriptor::Optional(&LONG);

const RAW_TOKEN: &str = "RolesEndpoint::raw_token";
const ISSUER: &str = "RolesEndpoint::issuer";
const JTI: &str = "RolesEndpoint::jti";
const PROVIDER_JTI: &str = "RolesEndpoint::provider_jti";
const OPT_JTI: &str = "RolesEndpoint::opt_jti";
const OBJ_JTI: &str = "RolesEndpoint::obj_jti";
const AUD: &str = "RolesEndpoint::aud";
const GROUPS: &str = "RolesEndpoint::groups";
const ISSUED_AT: &str = "RolesEndpoint::issued_at";
const DUP_ISSUED_AT: &str = "RolesEndpoint::dup_issued_at";
const PROVIDER_IAT: &str = "RolesEndpoint::provider_iat";
const OPT_SUBJECT: &str = "RolesEndpoint::opt_subject";
const AUTH_TIME: &str = "RolesEndpoint::auth_time";
const CUSTOM_MISSING: &str = "RolesEndpoint::custom";

macro_rules! roles_endpoint_claim {
    ($location:expr, $binding:expr, $ty:expr) => {
        inventory::submit! {
            InjectionPoint::new($location, $binding, $ty, Scope::Application)
        }
    };
}

roles_endpoint_claim!(RAW_TOKEN, ClaimBinding::standard(Claims::RawToken), TypeDescriptor::ClaimValue(&STRING));
roles_endpoint_claim!(ISSUER, ClaimBinding::standard(Claims::Iss), TypeDescriptor::ClaimValue(&STRING));
roles_endpoint_claim!(JTI, ClaimBinding::standard(Claims::Jti), TypeDescriptor::ClaimValue(&STRING));
roles_endpoint_claim!(PROVIDER_JTI, ClaimBinding::standard(Claims::Jti), TypeDescriptor::Provider(&STRING));
roles_endpoint_claim!(OPT_JTI, ClaimBinding::named("jti"), TypeDescriptor::ClaimValue(&OPT_STRING));
roles_endpoint_claim!(OBJ_JTI, ClaimBinding::named("jti"), TypeDescriptor::ClaimValue(&ANY));
roles_endpoint_claim!(AUD, ClaimBinding::named("aud"), TypeDescriptor::ClaimValue(&STRING_SET));
roles_endpoint_claim!(GROUPS, ClaimBinding::named("groups"), TypeDescriptor::ClaimValue(&STRING_SET));
roles_endpoint_claim!(ISSUED_AT, ClaimBinding::named("iat"), TypeDescriptor::ClaimValue(&LONG));
roles_endpoint_claim!(DUP_ISSUED_AT, ClaimBinding::named("iat"), TypeDescriptor::ClaimValue(&LONG));
roles_endpoint_claim!(PROVIDER_IAT, ClaimBinding::standard(Claims::Iat), TypeDescriptor::Provider(&LONG));
roles_endpoint_claim!(OPT_SUBJECT, ClaimBinding::named("sub"), TypeDescriptor::ClaimValue(&OPT_STRING));
roles_endpoint_claim!(AUTH_TIME, ClaimBinding::named("auth_time"), TypeDescriptor::ClaimValue(&OPT_LONG));
roles_endpoint_claim!(CUSTOM_MISSING, ClaimBinding::named("custom-missing"), TypeDescriptor::ClaimValue(&OPT_LONG));

pub struct Echoer;

impl RoleName for Echoer {
    const ROLE: &'static str = "Echoer";
}

pub struct NoSuchUser;

impl RoleName for NoSuchUser {
    const ROLE: &'static str = "NoSuchUser";
}

pub struct Group1MappedRole;

impl RoleName for Group1MappedRole {
    const ROLE: &'static str = "Group1MappedRole";
}

/// Application-wide state: providers resolved once, read per request.
#[derive(Clone)]
pub struct RolesEndpoint {
    provider_jti: ClaimProvider,
    provider_iat: ClaimProvider,
}

impl RolesEndpoint {
    /// # Errors
    ///
    /// Returns an [`InjectError`] when a provider site is unknown to `registry`.
    pub fn from_registry(registry: &ClaimProducerRegistry) -> Result<Self, InjectError> {
        let provider = |location: &str| {
            registry
                .inject_from(location, None)
                .and_then(<ClaimProvider as FromInjected>::from_injected)
        };
        Ok(Self {
            provider_jti: provider(PROVIDER_JTI)?,
            provider_iat: provider(PROVIDER_IAT)?,
        })
    }
}

/// Routes served under `/endp`, with `/endp/health` meant to be public.
///
/// # Errors
///
/// Returns an [`InjectError`] when the endpoint's provider sites were not collected.
pub fn router(registry: &Arc<ClaimProducerRegistry>) -> Result<Router, InjectError> {
    let endpoint = RolesEndpoint::from_registry(registry)?;
    Ok(Router::new()
        .route("/endp/echo", get(echo))
        .route("/endp/echo2", get(echo2))
        .route("/endp/needsGroup1Mapping", get(needs_group1_mapping))
        .route("/endp/whoami", get(whoami))
        .route("/endp/verifyInjectedIssuer", get(verify_injected_issuer))
        .route("/endp/verifyInjectedClaims", get(verify_injected_claims))
        .route("/endp/health", get(health))
        .with_state(endpoint))
}

#[derive(Debug, Deserialize)]
struct EchoQuery {
    input: Option<String>,
}

async fn echo(role: RequireRole<Echoer>, Query(query): Query<EchoQuery>) -> String {
    format!(
        "{}, user={}",
        query.input.unwrap_or_default(),
        role.caller().user_principal_name()
    )
}

async fn echo2(role: RequireRole<NoSuchUser>, Query(query): Query<EchoQuery>) -> String {
    format!(
        "{}, user={}",
        query.input.unwrap_or_default(),
        role.caller().user_principal_name()
    )
}

async fn needs_group1_mapping(role: RequireRole<Group1MappedRole>) -> String {
    role.caller().user_principal_name().to_owned()
}

async fn whoami(Caller(caller): Caller) -> Json<Value> {
    let identity = caller.identity();
    Json(json!({
        "name": identity.name(),
        "scheme": caller.auth_scheme(),
        "roles": identity.roles(),
        "groups": identity.groups(),
        "principals": identity.principals(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

#[derive(Debug, Deserialize)]
struct IssuerQuery {
    iss: Option<String>,
}

async fn verify_injected_issuer(
    injector: ClaimInjector,
    Query(query): Query<IssuerQuery>,
) -> Json<Value> {
    let issuer = inject::<ClaimValue<Option<String>>>(&injector, ISSUER).and_then(ClaimValue::into_value);
    let (pass, msg) = match (issuer, query.iss) {
        (None, _) => (false, "iss value is null or empty".to_owned()),
        (Some(actual), Some(expected)) if actual == expected => (true, "iss PASS".to_owned()),
        (Some(actual), expected) => (
            false,
            format!("iss: {actual} != {}", expected.unwrap_or_default()),
        ),
    };
    Json(json!({ "pass": pass, "msg": msg }))
}

#[derive(Debug, Default, Deserialize)]
struct ClaimsQuery {
    iss: Option<String>,
    raw_token: Option<String>,
    jti: Option<String>,
    aud: Option<String>,
    iat: Option<i64>,
    sub: Option<String>,
    auth_time: Option<i64>,
}

/// Compare each injected claim with the expected value from the query.
async fn verify_injected_claims(
    State(endpoint): State<RolesEndpoint>,
    injector: ClaimInjector,
    Query(query): Query<ClaimsQuery>,
) -> Json<Value> {
    let mut report = Map::new();
    let mut record = |name: &str, verdict: Verdict| {
        report.insert(name.to_owned(), Value::String(verdict.to_string()));
    };

    record("iss", Verdict::of(value::<String>(&injector, ISSUER), query.iss.as_ref()));
    record(
        "raw_token",
        Verdict::of(value::<String>(&injector, RAW_TOKEN), query.raw_token.as_ref()),
    );
    record("jti", Verdict::of(value::<String>(&injector, JTI), query.jti.as_ref()));
    record(
        "jti-Optional",
        Verdict::of(value::<String>(&injector, OPT_JTI), query.jti.as_ref()),
    );
    record(
        "jti-Object",
        Verdict::of(value::<String>(&injector, OBJ_JTI), query.jti.as_ref()),
    );
    record(
        "jti-Provider",
        Verdict::of(
            endpoint.provider_jti.get_as::<Option<String>>().ok().flatten(),
            query.jti.as_ref(),
        ),
    );
    record(
        "aud",
        match (value::<BTreeSet<String>>(&injector, AUD), query.aud.as_ref()) {
            (None, _) => Verdict::Missing,
            (Some(aud), Some(expected)) if aud.contains(expected) => Verdict::Pass,
            (Some(_), _) => Verdict::Fail,
        },
    );
    record("iat", Verdict::of(value::<i64>(&injector, ISSUED_AT), query.iat.as_ref()));
    record(
        "iat-Dupe",
        Verdict::of(value::<i64>(&injector, DUP_ISSUED_AT), query.iat.as_ref()),
    );
    record(
        "iat-Provider",
        Verdict::of(
            endpoint.provider_iat.get_as::<Option<i64>>().ok().flatten(),
            query.iat.as_ref(),
        ),
    );
    record(
        "sub-Optional",
        Verdict::of(value::<String>(&injector, OPT_SUBJECT), query.sub.as_ref()),
    );
    record(
        "auth_time",
        Verdict::of(value::<i64>(&injector, AUTH_TIME), query.auth_time.as_ref()),
    );
    record(
        "custom-missing",
        match inject::<ClaimValue<Option<i64>>>(&injector, CUSTOM_MISSING) {
            Some(custom) if custom.value().is_none() => Verdict::Pass,
            Some(_) => Verdict::Fail,
            None => Verdict::Missing,
        },
    );
    let groups = value::<BTreeSet<String>>(&injector, GROUPS).unwrap_or_default();
    report.insert("groups".to_owned(), json!(groups));

    Json(Value::Object(report))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Pass,
    Fail,
    Missing,
}

impl Verdict {
    fn of<T: PartialEq>(actual: Option<T>, expected: Option<&T>) -> Self {
        match (actual, expected) {
            (None, _) => Self::Missing,
            (Some(actual), Some(expected)) if &actual == expected => Self::Pass,
            (Some(_), _) => Self::Fail,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Missing => "MISSING",
        })
    }
}

fn inject<T: FromInjected>(injector: &ClaimInjector, location: &str) -> Option<T> {
    injector
        .inject_as::<T>(location)
        .inspect_err(|e| tracing::debug!("Injection at {location} failed: {e}"))
        .ok()
}

/// The value inside a `ClaimValue` site, absent or mistyped values as `None`.
fn value<T: FromInjected>(injector: &ClaimInjector, location: &str) -> Option<T> {
    inject::<ClaimValue<Option<T>>>(injector, location).and_then(ClaimValue::into_value)
}
