use arc_swap::ArcSwap;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};
use traffic_router_application::ports::GeolocationPort;
use traffic_router_domain::{DomainError, Geolocation, NetworkTable};

#[derive(Debug, Deserialize)]
struct GeolocationFile {
    #[serde(default)]
    networks: Vec<NetworkEntry>,
}

#[derive(Debug, Deserialize)]
struct NetworkEntry {
    network: String,
    latitude: f64,
    longitude: f64,
}

/// Client geolocation from a table of networks with coordinates.
pub struct NetworkGeolocation {
    table: ArcSwap<NetworkTable<Geolocation>>,
}

impl NetworkGeolocation {
    pub fn empty() -> Self {
        Self {
            table: ArcSwap::from_pointee(NetworkTable::new()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let geo = Self::empty();
        geo.reload_json(json)?;
        Ok(geo)
    }

    pub fn load_file(path: &Path) -> Result<Self, DomainError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn reload_json(&self, json: &str) -> Result<(), DomainError> {
        let file: GeolocationFile = serde_json::from_str(json)
            .map_err(|e| DomainError::InvalidSnapshot(format!("geolocation file: {e}")))?;

        let mut table = NetworkTable::new();
        for entry in file.networks {
            let geolocation = match Geolocation::new(entry.latitude, entry.longitude) {
                Ok(geolocation) => geolocation,
                Err(e) => {
                    warn!(network = %entry.network, error = %e, "Skipping geolocation entry");
                    continue;
                }
            };
            if let Err(e) = table.insert(&entry.network, geolocation) {
                warn!(network = %entry.network, error = %e, "Skipping geolocation entry");
            }
        }

        info!(networks = table.len(), "Geolocation table loaded");
        self.table.store(table.into());
        Ok(())
    }
}

impl Default for NetworkGeolocation {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeolocationPort for NetworkGeolocation {
    fn location(&self, ip: IpAddr) -> Option<Geolocation> {
        self.table.load().lookup(ip).copied()
    }
}
