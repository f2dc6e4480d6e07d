use std::net::IpAddr;
use traffic_router_domain::NetworkNode;

/// Port for mapping a client address to its coverage-zone entry.
pub trait CoverageZonePort: Send + Sync {
    fn network_node(&self, ip: IpAddr) -> Option<NetworkNode>;
}
