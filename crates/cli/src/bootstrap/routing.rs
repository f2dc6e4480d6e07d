use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use traffic_router_application::services::{CacheRegisterStore, TrafficRouter};
use traffic_router_domain::config::RoutingConfig;
use traffic_router_domain::DomainError;
use traffic_router_infrastructure::health::MonitorHealth;
use traffic_router_infrastructure::loc::{CoverageZoneMap, NetworkGeolocation};
use traffic_router_infrastructure::snapshot::load_cr_config;

/// Seeds the router from the files named in `[routing]`.
///
/// The snapshot is required. Coverage zones, geolocation and health fall
/// back to empty tables so the router still answers from what it has.
pub fn build_router(config: &RoutingConfig) -> anyhow::Result<Arc<TrafficRouter>> {
    let register = load_cr_config(Path::new(&config.snapshot_path))?;
    info!(
        path = %config.snapshot_path,
        delivery_services = register.delivery_services().count(),
        caches = register.caches().count(),
        "Cache register loaded"
    );

    let coverage_zones = optional(
        "coverage zone",
        &config.coverage_zone_path,
        CoverageZoneMap::load_file,
    );
    let geolocation = optional(
        "geolocation",
        &config.geolocation_path,
        NetworkGeolocation::load_file,
    );
    let health = optional("health", &config.health_path, MonitorHealth::load_file);

    Ok(Arc::new(TrafficRouter::new(
        Arc::new(CacheRegisterStore::new(register)),
        Arc::new(health),
        Arc::new(coverage_zones),
        Arc::new(geolocation),
    )))
}

fn optional<T: Default>(
    what: &str,
    path: &str,
    load: impl FnOnce(&Path) -> Result<T, DomainError>,
) -> T {
    match load(Path::new(path)) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(path = %path, error = %e, "Could not load {} data, starting empty", what);
            T::default()
        }
    }
}
