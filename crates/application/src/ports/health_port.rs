use traffic_router_domain::IpVersion;

/// Port for reading cache and delivery-service health published by the
/// monitoring collaborator. Unknown names are reported available.
pub trait HealthPort: Send + Sync {
    fn is_cache_available(&self, cache_id: &str, version: IpVersion) -> bool;

    fn is_delivery_service_available(&self, delivery_service_id: &str) -> bool;

    /// False when the delivery service has the location disabled.
    fn is_location_available(&self, delivery_service_id: &str, location_id: &str) -> bool;
}
