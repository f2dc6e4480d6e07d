use std::net::IpAddr;
use traffic_router_domain::Geolocation;

/// Port for locating a client on the globe.
pub trait GeolocationPort: Send + Sync {
    fn location(&self, ip: IpAddr) -> Option<Geolocation>;
}
