use std::sync::Arc;
use traffic_router_domain::{Cache, DeliveryService, InetRecord, Track};

/// Outcome of routing one DNS request.
#[derive(Debug, Clone)]
pub struct DnsRouteResult {
    pub delivery_service: Option<Arc<DeliveryService>>,
    pub addresses: Vec<InetRecord>,
    pub track: Track,
}

impl DnsRouteResult {
    /// True when the name belongs to no delivery service at all.
    pub fn is_unknown_name(&self) -> bool {
        self.delivery_service.is_none()
    }
}

/// Outcome of routing one HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRouteResult {
    pub delivery_service: Option<Arc<DeliveryService>>,
    pub cache: Option<Arc<Cache>>,
    pub url: Option<String>,
    pub track: Track,
}
