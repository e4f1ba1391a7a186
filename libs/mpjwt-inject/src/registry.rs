//! Claim producers built from collected metadata.

use std::collections::HashMap;
use std::sync::Arc;

use mpjwt_security::{JsonWebToken, TokenHolder};

use crate::collector::{ClaimBindingKey, ClaimBindingSite};
use crate::error::{ConfigError, InjectError};
use crate::value::{FromInjected, InjectedValue, produce};

/// Produces values for one claim binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimProducer {
    key: ClaimBindingKey,
}

impl ClaimProducer {
    #[must_use]
    pub fn key(&self) -> &ClaimBindingKey {
        &self.key
    }

    /// Produce the value for `token`, or for an anonymous request when `None`.
    #[must_use]
    pub fn produce(&self, token: Option<&JsonWebToken>) -> InjectedValue {
        produce(self.key.claim_name, self.key.declared_type, token)
    }

    /// Produce the value for the current request's token.
    #[must_use]
    pub fn produce_current(&self) -> InjectedValue {
        let token = TokenHolder::current();
        self.produce(token.as_deref())
    }
}

/// Lookup table from binding keys and injection sites to producers.
#[derive(Debug, Default)]
pub struct ClaimProducerRegistry {
    producers: HashMap<ClaimBindingKey, Arc<ClaimProducer>>,
    sites: HashMap<&'static str, ClaimBindingKey>,
}

impl ClaimProducerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one producer per collected binding.
    ///
    /// # Errors
    ///
    /// See [`ClaimProducerRegistry::register`].
    pub fn from_sites(sites: impl IntoIterator<Item = ClaimBindingSite>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for site in sites {
            registry.register(&site)?;
        }
        tracing::info!("Registered {} claim producers", registry.len());
        Ok(registry)
    }

    /// Register the producer for one binding and map its injection sites.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateProducer`] when the key is already registered
    /// - [`ConfigError::DuplicateSite`] when a location is already mapped
    pub fn register(&mut self, site: &ClaimBindingSite) -> Result<Arc<ClaimProducer>, ConfigError> {
        let key = *site.key();
        if self.producers.contains_key(&key) {
            return Err(ConfigError::DuplicateProducer {
                claim: key.claim_name,
                declared: key.declared_type,
            });
        }
        if let Some(location) = site.locations().find(|l| self.sites.contains_key(l)) {
            return Err(ConfigError::DuplicateSite { location });
        }

        let producer = Arc::new(ClaimProducer { key });
        self.producers.insert(key, Arc::clone(&producer));
        for location in site.locations() {
            self.sites.insert(location, key);
        }
        tracing::debug!(
            "Registered producer for {} as {}",
            key.claim_name,
            key.declared_type
        );
        Ok(producer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    #[must_use]
    pub fn producer(&self, key: &ClaimBindingKey) -> Option<&Arc<ClaimProducer>> {
        self.producers.get(key)
    }

    /// The producer serving an injection site.
    #[must_use]
    pub fn producer_for(&self, location: &str) -> Option<&Arc<ClaimProducer>> {
        self.sites.get(location).and_then(|key| self.producers.get(key))
    }

    /// Produce the value for `location` from an explicit token.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::UnknownSite`] when `location` was never collected.
    pub fn inject_from(
        &self,
        location: &str,
        token: Option<&JsonWebToken>,
    ) -> Result<InjectedValue, InjectError> {
        self.producer_for(location)
            .map(|producer| producer.produce(token))
            .ok_or_else(|| InjectError::UnknownSite(location.to_owned()))
    }

    /// Produce the value for `location` from the current request's token.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::UnknownSite`] when `location` was never collected.
    pub fn inject(&self, location: &str) -> Result<InjectedValue, InjectError> {
        let token = TokenHolder::current();
        self.inject_from(location, token.as_deref())
    }

    /// Produce and convert the value for `location` for the current request.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::UnknownSite`] for an unknown location, or the
    /// conversion error from [`FromInjected`].
    pub fn inject_as<T: FromInjected>(&self, location: &str) -> Result<T, InjectError> {
        self.inject(location).and_then(T::from_injected)
    }
}
