//! Values delivered to injection points.

use std::collections::{BTreeSet, HashSet};

use mpjwt_security::{ClaimData, JsonWebToken, TokenHolder};

use crate::binding::{TypeDescriptor, ValueType};
use crate::error::InjectError;
use crate::json::to_json;

/// A claim value together with the claim's name.
///
/// The value is resolved once, when the site is injected. Inject it per
/// request and do not keep it in state that outlives the request; long-lived
/// components hold a [`ClaimProvider`] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimValue<T> {
    name: String,
    value: T,
}

impl<T> ClaimValue<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Lazy handle to a claim of the current request.
///
/// Each [`ClaimProvider::get`] reads the token published for the request
/// being served at that moment, so a provider can be stored in long-lived
/// components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimProvider {
    name: &'static str,
    value_type: TypeDescriptor,
}

impl ClaimProvider {
    #[must_use]
    pub const fn new(name: &'static str, value_type: TypeDescriptor) -> Self {
        Self { name, value_type }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn value_type(&self) -> TypeDescriptor {
        self.value_type
    }

    /// Resolve the claim against the current request's token.
    #[must_use]
    pub fn get(&self) -> InjectedValue {
        let token = TokenHolder::current();
        produce(self.name, self.value_type, token.as_deref())
    }

    /// Resolve and convert the claim.
    ///
    /// # Errors
    ///
    /// Returns an [`InjectError`] when the value cannot be converted to `T`.
    pub fn get_as<T: FromInjected>(&self) -> Result<T, InjectError> {
        T::from_injected(self.get())
    }
}

/// A value produced for an injection point.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedValue {
    /// No token, no such claim, or a claim of another type.
    Null,
    Claim(ClaimData),
    Json(serde_json::Value),
    Optional(Option<Box<InjectedValue>>),
    ClaimValue(ClaimValue<Box<InjectedValue>>),
    Provider(ClaimProvider),
}

impl InjectedValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Claim(ClaimData::String(_)) => "String",
            Self::Claim(ClaimData::Long(_)) => "Long",
            Self::Claim(ClaimData::Double(_)) => "Double",
            Self::Claim(ClaimData::Boolean(_)) => "Boolean",
            Self::Claim(ClaimData::StringSet(_)) => "Set<String>",
            Self::Claim(ClaimData::List(_)) => "List",
            Self::Claim(ClaimData::Object(_)) => "JsonObject",
            Self::Json(_) => "JsonValue",
            Self::Optional(_) => "Optional",
            Self::ClaimValue(_) => "ClaimValue",
            Self::Provider(_) => "Provider",
        }
    }
}

/// Produce the value for a claim as `declared` from `token`.
pub(crate) fn produce(
    name: &'static str,
    declared: TypeDescriptor,
    token: Option<&JsonWebToken>,
) -> InjectedValue {
    match declared {
        TypeDescriptor::Value(ty) => token
            .and_then(|t| t.claim(name))
            .and_then(|data| coerce(data, ty))
            .map_or(InjectedValue::Null, InjectedValue::Claim),
        TypeDescriptor::Json(kind) => token
            .and_then(|t| t.claim(name))
            .and_then(|data| to_json(&data))
            .filter(|json| kind.matches(json))
            .map_or(InjectedValue::Null, InjectedValue::Json),
        TypeDescriptor::Optional(inner) => match produce(name, *inner, token) {
            InjectedValue::Null => InjectedValue::Optional(None),
            value => InjectedValue::Optional(Some(Box::new(value))),
        },
        TypeDescriptor::ClaimValue(inner) => InjectedValue::ClaimValue(ClaimValue::new(
            name,
            Box::new(produce(name, *inner, token)),
        )),
        TypeDescriptor::Provider(inner) => InjectedValue::Provider(ClaimProvider::new(name, *inner)),
    }
}

fn coerce(data: ClaimData, ty: ValueType) -> Option<ClaimData> {
    match (ty, data) {
        (ValueType::Any, data)
        | (ValueType::String, data @ ClaimData::String(_))
        | (ValueType::Long, data @ ClaimData::Long(_))
        | (ValueType::Double, data @ ClaimData::Double(_))
        | (ValueType::Boolean, data @ ClaimData::Boolean(_))
        | (ValueType::JsonObject, data @ ClaimData::Object(_)) => Some(data),
        (ValueType::Double, ClaimData::Long(n)) => exact_f64(n).map(ClaimData::Double),
        (ValueType::StringSet, data) => data.to_string_set().map(ClaimData::StringSet),
        _ => None,
    }
}

/// Largest magnitude an `i64` can have and still convert to `f64` exactly.
const MAX_EXACT_F64_INT: u64 = 1 << 53;

#[allow(clippy::cast_precision_loss)]
fn exact_f64(n: i64) -> Option<f64> {
    (n.unsigned_abs() <= MAX_EXACT_F64_INT).then(|| n as f64)
}

/// Conversion from an [`InjectedValue`] into a concrete Rust type.
///
/// Plain types reject absent values; wrap them in `Option` to accept absence.
pub trait FromInjected: Sized {
    /// # Errors
    ///
    /// Returns [`InjectError::Absent`] for a missing value and
    /// [`InjectError::TypeMismatch`] when the value has another type.
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError>;
}

fn mismatch(expected: &'static str, found: &InjectedValue) -> InjectError {
    InjectError::TypeMismatch {
        expected,
        found: found.describe(),
    }
}

fn claim_data(value: InjectedValue, expected: &'static str) -> Result<ClaimData, InjectError> {
    match value {
        InjectedValue::Claim(data) => Ok(data),
        InjectedValue::Null | InjectedValue::Optional(None) => Err(InjectError::Absent),
        InjectedValue::Optional(Some(inner)) => claim_data(*inner, expected),
        other => Err(mismatch(expected, &other)),
    }
}

impl FromInjected for InjectedValue {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        Ok(value)
    }
}

impl FromInjected for ClaimData {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        claim_data(value, "claim")
    }
}

impl FromInjected for String {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match claim_data(value, "String")? {
            ClaimData::String(s) => Ok(s),
            other => Err(mismatch("String", &InjectedValue::Claim(other))),
        }
    }
}

impl FromInjected for i64 {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match claim_data(value, "Long")? {
            ClaimData::Long(n) => Ok(n),
            other => Err(mismatch("Long", &InjectedValue::Claim(other))),
        }
    }
}

impl FromInjected for f64 {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match claim_data(value, "Double")? {
            ClaimData::Double(n) => Ok(n),
            other => Err(mismatch("Double", &InjectedValue::Claim(other))),
        }
    }
}

impl FromInjected for bool {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match claim_data(value, "Boolean")? {
            ClaimData::Boolean(b) => Ok(b),
            other => Err(mismatch("Boolean", &InjectedValue::Claim(other))),
        }
    }
}

impl FromInjected for BTreeSet<String> {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        let data = claim_data(value, "Set<String>")?;
        data.to_string_set()
            .ok_or_else(|| mismatch("Set<String>", &InjectedValue::Claim(data)))
    }
}

impl FromInjected for HashSet<String> {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        BTreeSet::<String>::from_injected(value).map(|set| set.into_iter().collect())
    }
}

impl FromInjected for serde_json::Value {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match value {
            InjectedValue::Json(json) => Ok(json),
            InjectedValue::Optional(Some(inner)) => Self::from_injected(*inner),
            other => {
                let data = claim_data(other, "JsonValue")?;
                to_json(&data).ok_or(InjectError::Absent)
            }
        }
    }
}

impl<T: FromInjected> FromInjected for Option<T> {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match value {
            InjectedValue::Null | InjectedValue::Optional(None) => Ok(None),
            InjectedValue::Optional(Some(inner)) => T::from_injected(*inner).map(Some),
            other => T::from_injected(other).map(Some),
        }
    }
}

impl<T: FromInjected> FromInjected for ClaimValue<T> {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match value {
            InjectedValue::ClaimValue(ClaimValue { name, value }) => {
                Ok(ClaimValue::new(name, T::from_injected(*value)?))
            }
            other => Err(mismatch("ClaimValue", &other)),
        }
    }
}

impl FromInjected for ClaimProvider {
    fn from_injected(value: InjectedValue) -> Result<Self, InjectError> {
        match value {
            InjectedValue::Provider(provider) => Ok(provider),
            other => Err(mismatch("Provider", &other)),
        }
    }
}
