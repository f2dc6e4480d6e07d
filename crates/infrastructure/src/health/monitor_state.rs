use arc_swap::ArcSwap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;
use traffic_router_application::ports::HealthPort;
use traffic_router_domain::{DomainError, IpVersion};

#[derive(Debug, Default, Deserialize)]
struct CrStates {
    #[serde(default)]
    caches: HashMap<String, CacheState>,
    #[serde(rename = "deliveryServices", default)]
    delivery_services: HashMap<String, DeliveryServiceState>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheState {
    #[serde(default = "default_available")]
    is_available: bool,
    ipv4_available: Option<bool>,
    ipv6_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryServiceState {
    #[serde(default = "default_available")]
    is_available: bool,
    #[serde(default)]
    disabled_locations: HashSet<String>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Default)]
struct HealthState {
    caches: HashMap<String, CacheState>,
    delivery_services: HashMap<String, DeliveryServiceState>,
}

impl From<CrStates> for HealthState {
    fn from(states: CrStates) -> Self {
        let caches = states
            .caches
            .into_iter()
            .map(|(name, state)| (cache_id(&name).to_string(), state))
            .collect();
        Self {
            caches,
            delivery_services: states.delivery_services,
        }
    }
}

/// Monitor entries may carry a `@suffix` after the cache name.
fn cache_id(name: &str) -> &str {
    name.split_once('@').map_or(name, |(id, _)| id)
}

/// Cache and delivery-service health published by the monitor.
///
/// Anything the monitor has not reported on is treated as available.
pub struct MonitorHealth {
    state: ArcSwap<HealthState>,
}

impl MonitorHealth {
    pub fn empty() -> Self {
        Self {
            state: ArcSwap::from_pointee(HealthState::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let health = Self::empty();
        health.reload_json(json)?;
        Ok(health)
    }

    pub fn load_file(path: &Path) -> Result<Self, DomainError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn reload_json(&self, json: &str) -> Result<(), DomainError> {
        let states: CrStates = serde_json::from_str(json)
            .map_err(|e| DomainError::InvalidSnapshot(format!("monitor states: {e}")))?;
        let state = HealthState::from(states);
        info!(
            caches = state.caches.len(),
            delivery_services = state.delivery_services.len(),
            "Monitor health state loaded"
        );
        self.state.store(state.into());
        Ok(())
    }
}

impl Default for MonitorHealth {
    fn default() -> Self {
        Self::empty()
    }
}

impl HealthPort for MonitorHealth {
    fn is_cache_available(&self, cache_id: &str, version: IpVersion) -> bool {
        let state = self.state.load();
        let Some(cache) = state.caches.get(cache_id) else {
            return true;
        };
        let by_version = match version {
            IpVersion::V4 => cache.ipv4_available,
            IpVersion::V6 => cache.ipv6_available,
        };
        by_version.unwrap_or(cache.is_available)
    }

    fn is_delivery_service_available(&self, delivery_service_id: &str) -> bool {
        self.state
            .load()
            .delivery_services
            .get(delivery_service_id)
            .map_or(true, |ds| ds.is_available)
    }

    fn is_location_available(&self, delivery_service_id: &str, location_id: &str) -> bool {
        self.state
            .load()
            .delivery_services
            .get(delivery_service_id)
            .map_or(true, |ds| !ds.disabled_locations.contains(location_id))
    }
}
