use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::RwLock;
use traffic_router_application::ports::{CoverageZonePort, GeolocationPort, HealthPort};
use traffic_router_domain::{Geolocation, IpVersion, NetworkNode};

#[derive(Default)]
pub struct MockHealth {
    down_caches: RwLock<HashSet<String>>,
    down_delivery_services: RwLock<HashSet<String>>,
    disabled_locations: RwLock<HashSet<(String, String)>>,
}

impl MockHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_cache_down(&self, cache_id: &str) {
        self.down_caches.write().unwrap().insert(cache_id.to_string());
    }

    pub fn mark_delivery_service_down(&self, delivery_service_id: &str) {
        self.down_delivery_services
            .write()
            .unwrap()
            .insert(delivery_service_id.to_string());
    }

    pub fn disable_location(&self, delivery_service_id: &str, location_id: &str) {
        self.disabled_locations
            .write()
            .unwrap()
            .insert((delivery_service_id.to_string(), location_id.to_string()));
    }
}

impl HealthPort for MockHealth {
    fn is_cache_available(&self, cache_id: &str, _version: IpVersion) -> bool {
        !self.down_caches.read().unwrap().contains(cache_id)
    }

    fn is_delivery_service_available(&self, delivery_service_id: &str) -> bool {
        !self
            .down_delivery_services
            .read()
            .unwrap()
            .contains(delivery_service_id)
    }

    fn is_location_available(&self, delivery_service_id: &str, location_id: &str) -> bool {
        !self
            .disabled_locations
            .read()
            .unwrap()
            .contains(&(delivery_service_id.to_string(), location_id.to_string()))
    }
}

#[derive(Default)]
pub struct MockCoverageZones {
    nodes: RwLock<HashMap<IpAddr, NetworkNode>>,
}

impl MockCoverageZones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, ip: IpAddr, loc: Option<&str>, geolocation: Option<Geolocation>) {
        self.nodes
            .write()
            .unwrap()
            .insert(ip, NetworkNode::new(loc, geolocation));
    }
}

impl CoverageZonePort for MockCoverageZones {
    fn network_node(&self, ip: IpAddr) -> Option<NetworkNode> {
        self.nodes.read().unwrap().get(&ip).cloned()
    }
}

#[derive(Default)]
pub struct MockGeolocation {
    locations: RwLock<HashMap<IpAddr, Geolocation>>,
}

impl MockGeolocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locate(&self, ip: IpAddr, geolocation: Geolocation) {
        self.locations.write().unwrap().insert(ip, geolocation);
    }
}

impl GeolocationPort for MockGeolocation {
    fn location(&self, ip: IpAddr) -> Option<Geolocation> {
        self.locations.read().unwrap().get(&ip).copied()
    }
}
