//! Classification of declared injection types.

use mpjwt_security::ClaimType;

use crate::binding::{JsonKind, TypeDescriptor, ValueType};

/// How a claim value is delivered to an injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimShape {
    /// The bare value, captured when injected.
    Raw,
    /// The value or empty, captured when injected.
    Optional,
    /// A named container around the value.
    ClaimValue,
    /// A named container around an optional value.
    OptionalClaimValue,
    /// A structured JSON value, captured when injected.
    Json,
    /// A lazy handle that reads the current request's token on every `get`.
    Provider,
}

impl ClaimShape {
    /// Shapes that capture the claim once and therefore cannot live in a
    /// component that outlives the request.
    ///
    /// `ClaimValue` shapes pass this check because the site is resolved per
    /// request through the registry. The [`ClaimValue`](crate::ClaimValue)
    /// it yields must not be stored in that component.
    #[must_use]
    pub const fn is_snapshot(self) -> bool {
        matches!(self, Self::Raw | Self::Optional | Self::Json)
    }
}

/// Result of classifying a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub shape: ClaimShape,
    /// The type inside the outermost wrapper(s) that define the shape.
    pub value_type: TypeDescriptor,
}

/// Determine the delivery shape of a declared type.
///
/// Returns `None` for nestings that have no meaning, such as
/// `Optional<Optional<T>>` or `Provider<Provider<T>>`.
#[must_use]
pub fn classify(declared: TypeDescriptor) -> Option<Classified> {
    let (shape, value_type) = match declared {
        TypeDescriptor::Value(_) => (ClaimShape::Raw, declared),
        TypeDescriptor::Json(_) => (ClaimShape::Json, declared),
        TypeDescriptor::Optional(inner) if inner.is_plain() => (ClaimShape::Optional, *inner),
        TypeDescriptor::ClaimValue(TypeDescriptor::Optional(inner)) if inner.is_plain() => {
            (ClaimShape::OptionalClaimValue, **inner)
        }
        TypeDescriptor::ClaimValue(inner) if inner.is_plain() => (ClaimShape::ClaimValue, *inner),
        TypeDescriptor::Provider(inner)
            if !matches!(inner, TypeDescriptor::Provider(_)) && classify(*inner).is_some() =>
        {
            (ClaimShape::Provider, *inner)
        }
        _ => return None,
    };
    Some(Classified { shape, value_type })
}

/// Whether the innermost declared type can carry a claim of `claim_type`.
#[must_use]
pub fn accepts(declared: TypeDescriptor, claim_type: ClaimType) -> bool {
    match declared.leaf() {
        TypeDescriptor::Value(ValueType::Any) | TypeDescriptor::Json(JsonKind::Value) => true,
        TypeDescriptor::Value(ty) => ty == ValueType::from(claim_type),
        TypeDescriptor::Json(kind) => matches!(
            (kind, claim_type),
            (JsonKind::String, ClaimType::String)
                | (JsonKind::Number, ClaimType::Long)
                | (JsonKind::Array, ClaimType::StringSet)
                | (JsonKind::Object, ClaimType::JsonObject)
        ),
        TypeDescriptor::Optional(_) | TypeDescriptor::ClaimValue(_) | TypeDescriptor::Provider(_) => {
            false
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use mpjwt_security::Claims;

    const STRING: TypeDescriptor = TypeDescriptor::Value(ValueType::String);
    const LONG: TypeDescriptor = TypeDescriptor::Value(ValueType::Long);

    #[test]
    fn plain_types_are_snapshots() {
        let raw = classify(STRING).unwrap();
        assert_eq!(raw.shape, ClaimShape::Raw);
        assert_eq!(raw.value_type, STRING);

        let json = classify(TypeDescriptor::Json(JsonKind::Number)).unwrap();
        assert_eq!(json.shape, ClaimShape::Json);
        assert!(json.shape.is_snapshot());
    }

    #[test]
    fn wrappers_are_unwrapped_once() {
        let optional = classify(TypeDescriptor::Optional(&LONG)).unwrap();
        assert_eq!(optional.shape, ClaimShape::Optional);
        assert_eq!(optional.value_type, LONG);

        let wrapped = classify(TypeDescriptor::ClaimValue(&LONG)).unwrap();
        assert_eq!(wrapped.shape, ClaimShape::ClaimValue);
        assert!(!wrapped.shape.is_snapshot());

        let wrapped_optional =
            classify(TypeDescriptor::ClaimValue(&TypeDescriptor::Optional(&LONG))).unwrap();
        assert_eq!(wrapped_optional.shape, ClaimShape::OptionalClaimValue);
        assert_eq!(wrapped_optional.value_type, LONG);
    }

    #[test]
    fn provider_keeps_inner_declaration() {
        const INNER: TypeDescriptor = TypeDescriptor::Optional(&STRING);
        let provider = classify(TypeDescriptor::Provider(&INNER)).unwrap();
        assert_eq!(provider.shape, ClaimShape::Provider);
        assert_eq!(provider.value_type, INNER);
    }

    #[test]
    fn meaningless_nestings_are_rejected() {
        const OPT: TypeDescriptor = TypeDescriptor::Optional(&STRING);
        const CV: TypeDescriptor = TypeDescriptor::ClaimValue(&STRING);
        const PROVIDER: TypeDescriptor = TypeDescriptor::Provider(&STRING);
        assert!(classify(TypeDescriptor::Optional(&OPT)).is_none());
        assert!(classify(TypeDescriptor::Optional(&CV)).is_none());
        assert!(classify(TypeDescriptor::ClaimValue(&CV)).is_none());
        assert!(classify(TypeDescriptor::Provider(&PROVIDER)).is_none());
    }

    fn leak(declared: TypeDescriptor) -> &'static TypeDescriptor {
        Box::leak(Box::new(declared))
    }

    #[test]
    fn every_standard_claim_classifies_in_every_wrapper() {
        for claim in Claims::ALL {
            let claim_type = claim.claim_type();
            let plain = TypeDescriptor::Value(ValueType::from(claim_type));
            let inner = leak(plain);
            let optional = leak(TypeDescriptor::Optional(inner));

            assert!(accepts(plain, claim_type), "{}", claim.name());
            assert!(
                !accepts(TypeDescriptor::Value(ValueType::Double), claim_type),
                "{}",
                claim.name()
            );

            let cases = [
                (plain, ClaimShape::Raw, plain),
                (*optional, ClaimShape::Optional, plain),
                (TypeDescriptor::ClaimValue(inner), ClaimShape::ClaimValue, plain),
                (TypeDescriptor::ClaimValue(optional), ClaimShape::OptionalClaimValue, plain),
                (TypeDescriptor::Provider(inner), ClaimShape::Provider, plain),
                (TypeDescriptor::Provider(optional), ClaimShape::Provider, *optional),
            ];
            for (declared, shape, value_type) in cases {
                let classified = classify(declared)
                    .unwrap_or_else(|| panic!("{} as {declared} unclassified", claim.name()));
                assert_eq!(classified.shape, shape, "{} as {declared}", claim.name());
                assert_eq!(classified.value_type, value_type, "{} as {declared}", claim.name());
                assert!(accepts(declared, claim_type), "{} as {declared}", claim.name());
            }
        }
    }

    #[test]
    fn standard_types_must_match() {
        assert!(accepts(STRING, ClaimType::String));
        assert!(accepts(TypeDescriptor::Optional(&LONG), ClaimType::Long));
        assert!(!accepts(STRING, ClaimType::Long));
        assert!(accepts(TypeDescriptor::Value(ValueType::Any), ClaimType::StringSet));
        assert!(accepts(TypeDescriptor::Json(JsonKind::Array), ClaimType::StringSet));
        assert!(accepts(TypeDescriptor::Json(JsonKind::Value), ClaimType::Boolean));
        assert!(!accepts(TypeDescriptor::Json(JsonKind::String), ClaimType::Long));
    }
}
