//! Deployment-time discovery of claim injection points.
//!
//! The collector validates every declared [`InjectionPoint`] and groups them
//! into one [`ClaimBindingSite`] per distinct claim name, shape, and declared
//! type. Validation failures abort collection with a [`ConfigError`].

use std::collections::{BTreeMap, HashSet};

use mpjwt_security::Claims;

use crate::binding::{InjectionPoint, TypeDescriptor};
use crate::error::ConfigError;
use crate::shape::{ClaimShape, accepts, classify};

/// Identity of a claim producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimBindingKey {
    pub claim_name: &'static str,
    pub shape: ClaimShape,
    pub declared_type: TypeDescriptor,
}

/// Injection points sharing one [`ClaimBindingKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimBindingSite {
    key: ClaimBindingKey,
    standard: Option<Claims>,
    points: Vec<InjectionPoint>,
}

impl ClaimBindingSite {
    #[must_use]
    pub fn key(&self) -> &ClaimBindingKey {
        &self.key
    }

    #[must_use]
    pub fn claim_name(&self) -> &'static str {
        self.key.claim_name
    }

    #[must_use]
    pub fn shape(&self) -> ClaimShape {
        self.key.shape
    }

    /// The standard claim behind this binding, if any.
    #[must_use]
    pub fn standard(&self) -> Option<Claims> {
        self.standard
    }

    #[must_use]
    pub fn points(&self) -> &[InjectionPoint] {
        &self.points
    }

    pub fn locations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.points.iter().map(|p| p.location)
    }
}

/// Accumulates and validates injection points.
#[derive(Debug, Default)]
pub struct MetadataCollector {
    sites: BTreeMap<ClaimBindingKey, ClaimBindingSite>,
    locations: HashSet<&'static str>,
}

impl MetadataCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one injection point and record it.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingClaimName`] when the binding names no claim
    /// - [`ConfigError::UnsupportedType`] for a declared type with no shape
    /// - [`ConfigError::TypeMismatch`] when a standard claim's type does not fit
    /// - [`ConfigError::ScopeViolation`] for a snapshot shape in a long-lived component
    /// - [`ConfigError::DuplicateSite`] when the location was already observed
    pub fn observe(&mut self, point: &InjectionPoint) -> Result<(), ConfigError> {
        let location = point.location;
        let declared = point.declared_type;

        let claim_name = point
            .binding
            .effective_name()
            .ok_or(ConfigError::MissingClaimName { location })?;

        let classified = classify(declared).ok_or(ConfigError::UnsupportedType { location, declared })?;

        let standard = point.binding.standard_claim();
        if let Some(claim) = standard
            && !accepts(declared, claim.claim_type())
        {
            return Err(ConfigError::TypeMismatch {
                location,
                claim: claim_name,
                expected: claim.claim_type(),
                declared,
            });
        }

        if classified.shape.is_snapshot() && point.owner_scope.outlives_request() {
            return Err(ConfigError::ScopeViolation {
                location,
                claim: claim_name,
                scope: point.owner_scope,
                declared,
            });
        }

        if !self.locations.insert(location) {
            return Err(ConfigError::DuplicateSite { location });
        }

        let key = ClaimBindingKey {
            claim_name,
            shape: classified.shape,
            declared_type: declared,
        };
        let site = self.sites.entry(key).or_insert_with(|| {
            tracing::debug!("New claim binding: {claim_name} as {declared}");
            ClaimBindingSite {
                key,
                standard,
                points: Vec::new(),
            }
        });
        site.points.push(*point);
        tracing::debug!("Claim injection point {location} -> {claim_name}");
        Ok(())
    }

    /// Number of distinct bindings collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// The collected bindings, ordered by key.
    #[must_use]
    pub fn finish(self) -> Vec<ClaimBindingSite> {
        self.sites.into_values().collect()
    }
}

/// Collect and validate a set of injection points.
///
/// # Errors
///
/// Returns the first [`ConfigError`] raised by [`MetadataCollector::observe`].
pub fn collect<'a>(
    points: impl IntoIterator<Item = &'a InjectionPoint>,
) -> Result<Vec<ClaimBindingSite>, ConfigError> {
    let mut collector = MetadataCollector::new();
    let mut observed = 0_usize;
    for point in points {
        collector.observe(point)?;
        observed += 1;
    }
    tracing::info!(
        "Collected {} claim bindings from {observed} injection points",
        collector.len()
    );
    Ok(collector.finish())
}

/// Collect every injection point registered with `inventory::submit!`.
///
/// # Errors
///
/// See [`collect`].
pub fn collect_registered() -> Result<Vec<ClaimBindingSite>, ConfigError> {
    collect(inventory::iter::<InjectionPoint>)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::binding::{ClaimBinding, Scope, ValueType};

    const STRING: TypeDescriptor = TypeDescriptor::Value(ValueType::String);
    const LONG: TypeDescriptor = TypeDescriptor::Value(ValueType::Long);
    const CV_STRING: TypeDescriptor = TypeDescriptor::ClaimValue(&STRING);

    #[test]
    fn sites_with_same_claim_and_type_share_a_binding() {
        let points = [
            InjectionPoint::new("A::iss", ClaimBinding::standard(Claims::Iss), STRING, Scope::Request),
            InjectionPoint::new("B::iss", ClaimBinding::named("iss"), STRING, Scope::Dependent),
            InjectionPoint::new("C::iss", ClaimBinding::standard(Claims::Iss), CV_STRING, Scope::Application),
        ];
        let sites = collect(&points).unwrap();
        assert_eq!(sites.len(), 2);

        let raw = sites.iter().find(|s| s.shape() == ClaimShape::Raw).unwrap();
        assert_eq!(raw.locations().collect::<Vec<_>>(), vec!["A::iss", "B::iss"]);
        assert_eq!(raw.standard(), Some(Claims::Iss));
    }

    #[test]
    fn unnamed_binding_is_rejected() {
        let point = InjectionPoint::new("A::nothing", ClaimBinding::named(""), STRING, Scope::Request);
        assert_eq!(
            collect([&point]),
            Err(ConfigError::MissingClaimName { location: "A::nothing" })
        );
    }

    #[test]
    fn raw_value_in_application_scope_is_rejected() {
        let point = InjectionPoint::new(
            "RolesEndpoint::raw_token",
            ClaimBinding::standard(Claims::RawToken),
            STRING,
            Scope::Application,
        );
        let err = collect([&point]).unwrap_err();
        assert!(matches!(err, ConfigError::ScopeViolation { scope: Scope::Application, .. }));
    }

    #[test]
    fn standard_claim_type_mismatch_is_rejected() {
        let point = InjectionPoint::new("A::iat", ClaimBinding::standard(Claims::Iat), STRING, Scope::Request);
        assert_eq!(
            collect([&point]),
            Err(ConfigError::TypeMismatch {
                location: "A::iat",
                claim: "iat",
                expected: mpjwt_security::ClaimType::Long,
                declared: STRING,
            })
        );
    }

    #[test]
    fn custom_claims_accept_any_type() {
        let point = InjectionPoint::new("A::custom", ClaimBinding::named("customLong"), LONG, Scope::Request);
        assert_eq!(collect([&point]).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let point = InjectionPoint::new("A::iss", ClaimBinding::standard(Claims::Iss), STRING, Scope::Request);
        assert_eq!(
            collect([&point, &point]),
            Err(ConfigError::DuplicateSite { location: "A::iss" })
        );
    }

    #[test]
    fn unsupported_nesting_is_rejected() {
        const NESTED: TypeDescriptor = TypeDescriptor::Optional(&CV_STRING);
        let point = InjectionPoint::new("A::nested", ClaimBinding::named("x"), NESTED, Scope::Request);
        assert!(matches!(
            collect([&point]),
            Err(ConfigError::UnsupportedType { location: "A::nested", .. })
        ));
    }
}
