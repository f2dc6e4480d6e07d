use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{
    Cache, CacheLocation, DeliveryService, DeliveryServiceMatcher, DomainError, Request,
    RequestMatcher, Steering,
};

/// Router-wide settings carried in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingSettings {
    pub domain_name: String,
    pub consistent_dns_routing: bool,
}

/// Immutable view of every cache, location and delivery service the router
/// knows about. Updates build a new register and publish it whole.
#[derive(Debug, Clone, Default)]
pub struct CacheRegister {
    settings: RoutingSettings,
    locations: BTreeMap<String, Arc<CacheLocation>>,
    caches: HashMap<String, Arc<Cache>>,
    delivery_services: HashMap<String, Arc<DeliveryService>>,
    matchers: Vec<DeliveryServiceMatcher>,
    steering: HashMap<String, Steering>,
}

impl CacheRegister {
    pub fn builder() -> CacheRegisterBuilder {
        CacheRegisterBuilder::default()
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// First delivery service, in matcher precedence order, whose matcher
    /// accepts the request.
    pub fn delivery_service_for(&self, request: &Request) -> Option<&Arc<DeliveryService>> {
        self.matchers
            .iter()
            .find(|m| m.matches(request))
            .and_then(|m| self.delivery_services.get(m.delivery_service_id()))
    }

    pub fn delivery_service(&self, id: &str) -> Option<&Arc<DeliveryService>> {
        self.delivery_services.get(id)
    }

    pub fn delivery_services(&self) -> impl Iterator<Item = &Arc<DeliveryService>> {
        self.delivery_services.values()
    }

    pub fn cache_location(&self, id: &str) -> Option<&Arc<CacheLocation>> {
        self.locations.get(id)
    }

    /// Ordered by location id.
    pub fn cache_locations(&self) -> impl Iterator<Item = &Arc<CacheLocation>> {
        self.locations.values()
    }

    pub fn cache(&self, id: &str) -> Option<&Arc<Cache>> {
        self.caches.get(id)
    }

    pub fn caches(&self) -> impl Iterator<Item = &Arc<Cache>> {
        self.caches.values()
    }

    pub fn matchers(&self) -> &[DeliveryServiceMatcher] {
        &self.matchers
    }

    pub fn steering(&self, delivery_service_id: &str) -> Option<&Steering> {
        self.steering.get(delivery_service_id)
    }

    /// Copy of this register with a replaced matcher set.
    pub fn with_matchers(&self, mut matchers: Vec<DeliveryServiceMatcher>) -> Self {
        matchers.sort();
        Self {
            matchers,
            ..self.clone()
        }
    }

    /// Copy of this register with a replaced steering registry.
    pub fn with_steering(&self, steering: Vec<Steering>) -> Self {
        Self {
            steering: steering
                .into_iter()
                .map(|s| (s.delivery_service_id().to_string(), s))
                .collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheRegisterBuilder {
    settings: RoutingSettings,
    locations: BTreeMap<String, CacheLocation>,
    caches: Vec<Cache>,
    delivery_services: HashMap<String, DeliveryService>,
    matchers: Vec<DeliveryServiceMatcher>,
    steering: Vec<Steering>,
}

impl CacheRegisterBuilder {
    pub fn settings(mut self, settings: RoutingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn location(mut self, location: CacheLocation) -> Self {
        self.locations.insert(location.id().to_string(), location);
        self
    }

    pub fn cache(mut self, cache: Cache) -> Self {
        self.caches.push(cache);
        self
    }

    pub fn delivery_service(mut self, delivery_service: DeliveryService) -> Self {
        self.delivery_services
            .insert(delivery_service.id().to_string(), delivery_service);
        self
    }

    /// One match set for a delivery service; every matcher in it must match.
    pub fn match_set(mut self, delivery_service_id: &str, matchers: Vec<RequestMatcher>) -> Self {
        let sequence = self.matchers.len() as u64;
        let mut set = DeliveryServiceMatcher::new(delivery_service_id, sequence);
        for matcher in matchers {
            set.add_match(matcher);
        }
        self.matchers.push(set);
        self
    }

    pub fn steering(mut self, steering: Steering) -> Self {
        self.steering.push(steering);
        self
    }

    pub fn build(self) -> Result<CacheRegister, DomainError> {
        let mut locations = self.locations;
        let mut caches = HashMap::with_capacity(self.caches.len());

        for cache in self.caches {
            let location = locations.get_mut(cache.location_id()).ok_or_else(|| {
                DomainError::CacheLocationNotFound(format!(
                    "{} (referenced by cache {})",
                    cache.location_id(),
                    cache.id()
                ))
            })?;
            let cache = Arc::new(cache);
            location.add_cache(cache.clone());
            caches.insert(cache.id().to_string(), cache);
        }

        for matcher in &self.matchers {
            if !self.delivery_services.contains_key(matcher.delivery_service_id()) {
                return Err(DomainError::DeliveryServiceNotFound(
                    matcher.delivery_service_id().to_string(),
                ));
            }
        }

        let mut matchers = self.matchers;
        matchers.sort();

        Ok(CacheRegister {
            settings: self.settings,
            locations: locations
                .into_iter()
                .map(|(id, location)| (id, Arc::new(location)))
                .collect(),
            caches,
            delivery_services: self
                .delivery_services
                .into_iter()
                .map(|(id, ds)| (id, Arc::new(ds)))
                .collect(),
            matchers,
            steering: self
                .steering
                .into_iter()
                .map(|s| (s.delivery_service_id().to_string(), s))
                .collect(),
        })
    }
}
