use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use traffic_router_application::services::{CacheRegisterStore, TrafficRouter};
use traffic_router_domain::{
    Cache, CacheLocation, CacheRegister, CacheRegisterBuilder, DeliveryService, DnsRequest,
    Geolocation, HttpRequest, QueryType, RequestMatcher,
};

use super::mock_ports::{MockCoverageZones, MockGeolocation, MockHealth};

pub const CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

pub fn denver() -> Geolocation {
    Geolocation::new(39.7392, -104.9903).unwrap()
}

pub fn chicago() -> Geolocation {
    Geolocation::new(41.8781, -87.6298).unwrap()
}

pub fn nyc() -> Geolocation {
    Geolocation::new(40.7128, -74.0060).unwrap()
}

pub fn edge_cache(id: &str, location: &str, host: u8) -> Cache {
    Cache::new(id, location)
        .with_fqdn(&format!("{id}.cdn.test"))
        .with_ip4(Some(Ipv4Addr::new(10, 0, 0, host)))
        .with_ip6(Some(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, host as u16)))
        .with_hashing(id, 200)
        .with_delivery_service("video", &format!("{id}.video.cdn.test"))
        .with_delivery_service("web", &format!("{id}.web.cdn.test"))
}

pub fn video_service() -> DeliveryService {
    DeliveryService::new("video")
        .with_dns(true)
        .with_routing_name("edge")
        .with_domain("video.cdn.test")
}

pub fn web_service() -> DeliveryService {
    DeliveryService::new("web")
        .with_routing_name("tr")
        .with_domain("web.cdn.test")
}

/// Three locations: denver (edge-den-1, edge-den-2), chicago (edge-chi-1)
/// and nyc (edge-nyc-1). Locations added later replace these by id.
pub fn register_builder(video: DeliveryService) -> CacheRegisterBuilder {
    CacheRegister::builder()
        .location(CacheLocation::new("denver", denver()))
        .location(CacheLocation::new("chicago", chicago()))
        .location(CacheLocation::new("nyc", nyc()))
        .cache(edge_cache("edge-den-1", "denver", 11))
        .cache(edge_cache("edge-den-2", "denver", 12))
        .cache(edge_cache("edge-chi-1", "chicago", 21))
        .cache(edge_cache("edge-nyc-1", "nyc", 31))
        .delivery_service(video)
        .delivery_service(web_service())
        .match_set("video", vec![RequestMatcher::host(r".*\.video\.cdn\.test").unwrap()])
        .match_set("web", vec![RequestMatcher::host(r".*\.web\.cdn\.test").unwrap()])
}

pub fn standard_register() -> CacheRegister {
    register_builder(video_service()).build().unwrap()
}

pub fn dns_request(name: &str) -> DnsRequest {
    DnsRequest::new(CLIENT_IP, name, QueryType::A)
}

pub fn http_request(host: &str, path: &str) -> HttpRequest {
    HttpRequest::new(CLIENT_IP, host, path)
}

pub struct Harness {
    pub router: TrafficRouter,
    pub store: Arc<CacheRegisterStore>,
    pub health: Arc<MockHealth>,
    pub zones: Arc<MockCoverageZones>,
    pub geo: Arc<MockGeolocation>,
}

impl Harness {
    pub fn new(register: CacheRegister) -> Self {
        let store = Arc::new(CacheRegisterStore::new(register));
        let health = Arc::new(MockHealth::new());
        let zones = Arc::new(MockCoverageZones::new());
        let geo = Arc::new(MockGeolocation::new());
        let router = TrafficRouter::new(store.clone(), health.clone(), zones.clone(), geo.clone());
        Self {
            router,
            store,
            health,
            zones,
            geo,
        }
    }

    pub fn standard() -> Self {
        Self::new(standard_register())
    }

    /// Puts the test client in the coverage zone of `location`.
    pub fn client_in_zone(&self, location: &str, geolocation: Geolocation) {
        self.zones.assign(CLIENT_IP, Some(location), Some(geolocation));
    }

    pub fn client_at(&self, geolocation: Geolocation) {
        self.geo.locate(CLIENT_IP, geolocation);
    }
}

pub fn addresses(records: &[traffic_router_domain::InetRecord]) -> Vec<IpAddr> {
    let mut ips: Vec<IpAddr> = records.iter().map(|r| r.address).collect();
    ips.sort();
    ips
}

pub fn v4(host: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, host))
}
