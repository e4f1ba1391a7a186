//! Declarative model of claim injection points.
//!
//! An [`InjectionPoint`] is the static counterpart of an annotated field or
//! parameter: where it lives, which claim it binds, the declared type, and
//! the lifetime of the component declaring it. Every type here is `const`
//! constructible so points can be registered with [`inventory::submit!`]:
//!
//! ```ignore
//! inventory::submit! {
//!     InjectionPoint::new(
//!         "RolesEndpoint::issuer",
//!         ClaimBinding::standard(Claims::Iss),
//!         TypeDescriptor::ClaimValue(&TypeDescriptor::Value(ValueType::String)),
//!         Scope::Application,
//!     )
//! }
//! ```

use std::fmt;

use mpjwt_security::{ClaimType, Claims};

/// The claim selected by an injection point.
///
/// A standard claim wins over the literal name when both are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimBinding {
    pub standard: Option<Claims>,
    pub value: &'static str,
}

impl ClaimBinding {
    #[must_use]
    pub const fn standard(claim: Claims) -> Self {
        Self {
            standard: Some(claim),
            value: "",
        }
    }

    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self {
            standard: None,
            value: name,
        }
    }

    /// Claim name used for lookups, or `None` when the binding names nothing.
    #[must_use]
    pub fn effective_name(&self) -> Option<&'static str> {
        match self.standard {
            Some(claim) => Some(claim.name()),
            None if self.value.is_empty() => None,
            None => Some(self.value),
        }
    }

    /// The standard claim this binding refers to, by enum or by literal name.
    #[must_use]
    pub fn standard_claim(&self) -> Option<Claims> {
        self.standard.or_else(|| Claims::from_name(self.value))
    }
}

/// Lifetime of the component that declares an injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// One instance per request.
    Request,
    /// Instance lifetime follows whoever injects it.
    Dependent,
    /// One instance per user session.
    Session,
    /// One instance for the whole application.
    Application,
}

impl Scope {
    /// Whether an instance can outlive a single request.
    #[must_use]
    pub const fn outlives_request(self) -> bool {
        matches!(self, Self::Session | Self::Application)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Dependent => "dependent",
            Self::Session => "session",
            Self::Application => "application",
        })
    }
}

/// Plain value types an injection point can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    String,
    Long,
    /// Also accepts a `Long` claim whose magnitude is at most 2^53, the
    /// range where the conversion to `f64` is exact. Larger values are absent.
    Double,
    Boolean,
    StringSet,
    JsonObject,
    /// Untyped; accepts whatever the token carries.
    Any,
}

impl From<ClaimType> for ValueType {
    fn from(ty: ClaimType) -> Self {
        match ty {
            ClaimType::String => Self::String,
            ClaimType::Long => Self::Long,
            ClaimType::Boolean => Self::Boolean,
            ClaimType::StringSet => Self::StringSet,
            ClaimType::JsonObject => Self::JsonObject,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "String",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::StringSet => "Set<String>",
            Self::JsonObject => "JsonObject",
            Self::Any => "Object",
        })
    }
}

/// Structured JSON types an injection point can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JsonKind {
    Value,
    String,
    Number,
    Array,
    Object,
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "JsonValue",
            Self::String => "JsonString",
            Self::Number => "JsonNumber",
            Self::Array => "JsonArray",
            Self::Object => "JsonObject",
        })
    }
}

/// Declared type of an injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeDescriptor {
    Value(ValueType),
    Json(JsonKind),
    Optional(&'static TypeDescriptor),
    ClaimValue(&'static TypeDescriptor),
    Provider(&'static TypeDescriptor),
}

impl TypeDescriptor {
    /// The innermost plain or JSON type under any wrappers.
    #[must_use]
    pub fn leaf(self) -> TypeDescriptor {
        match self {
            Self::Value(_) | Self::Json(_) => self,
            Self::Optional(inner) | Self::ClaimValue(inner) | Self::Provider(inner) => inner.leaf(),
        }
    }

    #[must_use]
    pub const fn is_plain(self) -> bool {
        matches!(self, Self::Value(_) | Self::Json(_))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(ty) => write!(f, "{ty}"),
            Self::Json(kind) => write!(f, "{kind}"),
            Self::Optional(inner) => write!(f, "Optional<{inner}>"),
            Self::ClaimValue(inner) => write!(f, "ClaimValue<{inner}>"),
            Self::Provider(inner) => write!(f, "Provider<{inner}>"),
        }
    }
}

/// One declared claim injection site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InjectionPoint {
    /// Human-readable location, unique per site (e.g. `RolesEndpoint::issuer`).
    pub location: &'static str,
    pub binding: ClaimBinding,
    pub declared_type: TypeDescriptor,
    pub owner_scope: Scope,
}

impl InjectionPoint {
    #[must_use]
    pub const fn new(
        location: &'static str,
        binding: ClaimBinding,
        declared_type: TypeDescriptor,
        owner_scope: Scope,
    ) -> Self {
        Self {
            location,
            binding,
            declared_type,
            owner_scope,
        }
    }
}

inventory::collect!(InjectionPoint);
