use arc_swap::ArcSwap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};
use traffic_router_application::ports::CoverageZonePort;
use traffic_router_domain::{DomainError, Geolocation, NetworkNode, NetworkTable};

#[derive(Debug, Deserialize)]
struct CoverageZoneFile {
    #[serde(rename = "coverageZones", default)]
    coverage_zones: BTreeMap<String, CoverageZoneEntry>,
}

#[derive(Debug, Deserialize)]
struct CoverageZoneEntry {
    #[serde(default)]
    network: Vec<String>,
    #[serde(default)]
    network6: Vec<String>,
    coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

/// Client networks mapped to the cache location that covers them.
pub struct CoverageZoneMap {
    table: ArcSwap<NetworkTable<NetworkNode>>,
}

impl CoverageZoneMap {
    pub fn empty() -> Self {
        Self {
            table: ArcSwap::from_pointee(NetworkTable::new()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let map = Self::empty();
        map.reload_json(json)?;
        Ok(map)
    }

    pub fn load_file(path: &Path) -> Result<Self, DomainError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Replaces the whole table; lookups in flight keep the old one.
    pub fn reload_json(&self, json: &str) -> Result<(), DomainError> {
        let table = parse_coverage_zones(json)?;
        info!(networks = table.len(), "Coverage zone map loaded");
        self.table.store(table.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CoverageZoneMap {
    fn default() -> Self {
        Self::empty()
    }
}

impl CoverageZonePort for CoverageZoneMap {
    fn network_node(&self, ip: IpAddr) -> Option<NetworkNode> {
        self.table.load().lookup(ip).cloned()
    }
}

fn parse_coverage_zones(json: &str) -> Result<NetworkTable<NetworkNode>, DomainError> {
    let file: CoverageZoneFile = serde_json::from_str(json)
        .map_err(|e| DomainError::InvalidSnapshot(format!("coverage zone file: {e}")))?;

    let mut table = NetworkTable::new();
    for (loc, entry) in &file.coverage_zones {
        let geolocation = entry.coordinates.as_ref().and_then(|c| {
            Geolocation::new(c.latitude, c.longitude)
                .map_err(|e| warn!(location = %loc, error = %e, "Ignoring coverage zone coordinates"))
                .ok()
        });
        let node = NetworkNode::new(Some(loc), geolocation);

        for network in entry.network.iter().chain(&entry.network6) {
            if let Err(e) = table.insert(network, node.clone()) {
                warn!(location = %loc, network = %network, error = %e, "Skipping coverage zone network");
            }
        }
    }
    Ok(table)
}
