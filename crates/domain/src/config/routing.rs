use serde::{Deserialize, Serialize};

/// Locations of the data files a router is seeded from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default = "default_coverage_zone_path")]
    pub coverage_zone_path: String,

    #[serde(default = "default_geolocation_path")]
    pub geolocation_path: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            coverage_zone_path: default_coverage_zone_path(),
            geolocation_path: default_geolocation_path(),
            health_path: default_health_path(),
        }
    }
}

fn default_snapshot_path() -> String {
    "/opt/traffic_router/db/cr-config.json".to_string()
}

fn default_coverage_zone_path() -> String {
    "/opt/traffic_router/db/czf.json".to_string()
}

fn default_geolocation_path() -> String {
    "/opt/traffic_router/db/geo.json".to_string()
}

fn default_health_path() -> String {
    "/opt/traffic_router/db/cr-states.json".to_string()
}
