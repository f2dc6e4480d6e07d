//! Loader for the router configuration snapshot (CRConfig JSON).

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::{debug, info, warn};
use traffic_router_domain::{
    Cache, CacheLocation, CacheRegister, CacheRegisterBuilder, DeliveryService, Dispersion,
    DomainError, Geolocation, LocalizationMethod, MatchType, RequestMatcher, RoutingSettings,
    Steering, SteeringTarget, Ttls, DEFAULT_HASH_COUNT,
};

/// Booleans arrive both as JSON booleans and as `"true"`/`"false"` strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(value) => *value,
            Flag::Text(text) => text.eq_ignore_ascii_case("true"),
        }
    }
}

fn flag(value: &Option<Flag>, default: bool) -> bool {
    value.as_ref().map_or(default, Flag::is_set)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrConfig {
    #[serde(default)]
    config: RouterSettingsJson,
    #[serde(default)]
    edge_locations: BTreeMap<String, EdgeLocationJson>,
    #[serde(default)]
    content_servers: BTreeMap<String, ContentServerJson>,
    #[serde(default)]
    delivery_services: BTreeMap<String, DeliveryServiceJson>,
    #[serde(default)]
    steering: Vec<SteeringJson>,
}

#[derive(Debug, Default, Deserialize)]
struct RouterSettingsJson {
    #[serde(default)]
    domain_name: String,
    #[serde(rename = "consistent.dns.routing")]
    consistent_dns_routing: Option<Flag>,
    #[serde(rename = "confighandler.regex.superhack.enabled")]
    regex_superhack: Option<Flag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeLocationJson {
    latitude: f64,
    longitude: f64,
    backup_locations: Option<BackupLocationsJson>,
    #[serde(default)]
    localization_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupLocationsJson {
    #[serde(default)]
    list: Vec<String>,
    fallback_to_closest: Option<Flag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentServerJson {
    location_id: String,
    fqdn: String,
    #[serde(default = "default_port")]
    port: u16,
    ip: Option<String>,
    ip6: Option<String>,
    hash_id: Option<String>,
    hash_count: Option<usize>,
    #[serde(default)]
    delivery_services: BTreeMap<String, DeliveryServiceNames>,
}

fn default_port() -> u16 {
    80
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeliveryServiceNames {
    List(Vec<String>),
    One(String),
}

impl DeliveryServiceNames {
    fn first(&self) -> Option<&str> {
        match self {
            DeliveryServiceNames::List(names) => names.first().map(String::as_str),
            DeliveryServiceNames::One(name) => Some(name),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryServiceJson {
    #[serde(default)]
    matchsets: Vec<MatchSetJson>,
    routing_name: Option<String>,
    #[serde(default)]
    domains: Vec<String>,
    ttls: Option<TtlsJson>,
    coverage_zone_only: Option<Flag>,
    dispersion: Option<DispersionJson>,
    consistent_hash_regex: Option<String>,
    #[serde(default)]
    consistent_hash_query_params: Vec<String>,
    miss_location: Option<MissLocationJson>,
    #[serde(default)]
    location_failover_limit: usize,
    #[serde(default)]
    max_dns_ips_for_location: usize,
    ip6_routing_enabled: Option<Flag>,
    #[serde(default)]
    request_headers: Vec<String>,
    #[serde(default)]
    response_headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MatchSetJson {
    protocol: String,
    #[serde(default)]
    matchlist: Vec<MatcherJson>,
}

#[derive(Debug, Deserialize)]
struct MatcherJson {
    regex: String,
    #[serde(rename = "match-type")]
    match_type: String,
    target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TtlsJson {
    #[serde(rename = "A")]
    a: Option<u32>,
    #[serde(rename = "AAAA")]
    aaaa: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DispersionJson {
    #[serde(default = "default_dispersion_limit")]
    limit: usize,
    shuffled: Option<Flag>,
}

fn default_dispersion_limit() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct MissLocationJson {
    lat: f64,
    long: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SteeringJson {
    delivery_service: String,
    #[serde(default)]
    targets: Vec<SteeringTargetJson>,
    #[serde(default)]
    filters: Vec<SteeringFilterJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SteeringTargetJson {
    delivery_service: String,
    #[serde(default)]
    weight: usize,
    #[serde(default)]
    order: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SteeringFilterJson {
    pattern: String,
    delivery_service: String,
}

pub fn load_cr_config(path: &Path) -> Result<CacheRegister, DomainError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
    parse_cr_config(&json)
}

pub fn parse_cr_config(json: &str) -> Result<CacheRegister, DomainError> {
    let snapshot: CrConfig = serde_json::from_str(json)
        .map_err(|e| DomainError::InvalidSnapshot(format!("CRConfig: {e}")))?;

    let settings = RoutingSettings {
        domain_name: snapshot.config.domain_name.to_ascii_lowercase(),
        consistent_dns_routing: flag(&snapshot.config.consistent_dns_routing, false),
    };
    let superhack = flag(&snapshot.config.regex_superhack, true);

    let mut builder = CacheRegister::builder().settings(settings);

    for (id, location) in &snapshot.edge_locations {
        builder = builder.location(build_location(id, location)?);
    }

    for (id, server) in &snapshot.content_servers {
        if !snapshot.edge_locations.contains_key(&server.location_id) {
            warn!(cache = %id, location = %server.location_id, "Skipping cache in unknown location");
            continue;
        }
        builder = builder.cache(build_cache(id, server));
    }

    for (id, ds) in &snapshot.delivery_services {
        builder = builder.delivery_service(build_delivery_service(id, ds)?);
        builder = add_match_sets(builder, id, &ds.matchsets, superhack)?;
    }

    for steering in &snapshot.steering {
        builder = builder.steering(build_steering(steering)?);
    }

    let register = builder.build()?;
    info!(
        delivery_services = snapshot.delivery_services.len(),
        caches = register.caches().count(),
        locations = snapshot.edge_locations.len(),
        "CRConfig parsed"
    );
    Ok(register)
}

fn build_location(id: &str, json: &EdgeLocationJson) -> Result<CacheLocation, DomainError> {
    let geolocation = Geolocation::new(json.latitude, json.longitude)?;

    let mut methods = HashSet::new();
    for method in &json.localization_methods {
        match method.as_str() {
            "CZ" => {
                methods.insert(LocalizationMethod::CoverageZone);
            }
            "GEO" => {
                methods.insert(LocalizationMethod::Geo);
            }
            other => {
                warn!(location = %id, method = %other, "Unknown localization method, skipping");
            }
        }
    }

    let mut location = CacheLocation::new(id, geolocation).with_localization_methods(methods);
    if let Some(backups) = &json.backup_locations {
        location = location.with_backups(
            backups.list.clone(),
            flag(&backups.fallback_to_closest, false),
        );
    }
    Ok(location)
}

fn build_cache(id: &str, json: &ContentServerJson) -> Cache {
    let ip4 = json.ip.as_deref().and_then(|ip| {
        ip.parse::<Ipv4Addr>()
            .map_err(|e| warn!(cache = %id, ip = %ip, error = %e, "Ignoring IPv4 address"))
            .ok()
    });
    let ip6 = json.ip6.as_deref().filter(|ip| !ip.is_empty()).and_then(|ip| {
        let address = ip.split('/').next().unwrap_or(ip);
        address
            .parse::<Ipv6Addr>()
            .map_err(|e| warn!(cache = %id, ip6 = %ip, error = %e, "Ignoring IPv6 address"))
            .ok()
    });

    let hash_id = json.hash_id.as_deref().unwrap_or(id);
    let hash_count = json
        .hash_count
        .filter(|count| *count > 0)
        .unwrap_or(DEFAULT_HASH_COUNT);

    let mut cache = Cache::new(id, &json.location_id)
        .with_fqdn(&json.fqdn)
        .with_port(json.port)
        .with_ip4(ip4)
        .with_ip6(ip6)
        .with_hashing(hash_id, hash_count);

    for (ds_id, names) in &json.delivery_services {
        match names.first() {
            Some(fqdn) => cache = cache.with_delivery_service(ds_id, fqdn),
            None => debug!(cache = %id, delivery_service = %ds_id, "Delivery service without names"),
        }
    }
    cache
}

fn build_delivery_service(id: &str, json: &DeliveryServiceJson) -> Result<DeliveryService, DomainError> {
    let mut ds = DeliveryService::new(id)
        .with_dns(json.matchsets.iter().any(|m| m.protocol.eq_ignore_ascii_case("DNS")))
        .with_coverage_zone_only(flag(&json.coverage_zone_only, false))
        .with_consistent_hash_query_params(json.consistent_hash_query_params.iter().cloned())
        .with_location_failover_limit(json.location_failover_limit)
        .with_max_dns_ips(json.max_dns_ips_for_location)
        .with_ip6_routing(flag(&json.ip6_routing_enabled, false))
        .with_request_headers(json.request_headers.clone())
        .with_response_headers(
            json.response_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

    if let Some(routing_name) = &json.routing_name {
        ds = ds.with_routing_name(routing_name);
    }
    if let Some(domain) = json.domains.first() {
        ds = ds.with_domain(domain);
    }
    if let Some(ttls) = &json.ttls {
        let defaults = Ttls::default();
        ds = ds.with_ttls(Ttls {
            a: ttls.a.unwrap_or(defaults.a),
            aaaa: ttls.aaaa.unwrap_or(defaults.aaaa),
        });
    }
    if let Some(dispersion) = &json.dispersion {
        ds = ds.with_dispersion(Dispersion::new(
            dispersion.limit,
            flag(&dispersion.shuffled, true),
        ));
    }
    if let Some(regex) = json.consistent_hash_regex.as_deref().filter(|r| !r.is_empty()) {
        ds = ds.with_consistent_hash_regex(regex)?;
    }
    if let Some(miss) = &json.miss_location {
        match Geolocation::new(miss.lat, miss.long) {
            Ok(location) => ds = ds.with_miss_location(Some(location)),
            Err(e) => warn!(delivery_service = %id, error = %e, "Ignoring miss location"),
        }
    }

    Ok(ds)
}

/// Lets the first HOST matcher of the first match set also match the bare
/// domain: a leading `.*\.` becomes `(.*\.|^)`.
fn widen_host_regex(regex: &str) -> String {
    match regex.strip_prefix(r".*\.") {
        Some(rest) => format!(r"(.*\.|^){rest}"),
        None => regex.to_string(),
    }
}

fn add_match_sets(
    mut builder: CacheRegisterBuilder,
    ds_id: &str,
    match_sets: &[MatchSetJson],
    superhack: bool,
) -> Result<CacheRegisterBuilder, DomainError> {
    for (i, set) in match_sets.iter().enumerate() {
        let mut matchers = Vec::with_capacity(set.matchlist.len());
        for (j, matcher) in set.matchlist.iter().enumerate() {
            let match_type: MatchType = matcher.match_type.parse()?;
            let regex = if superhack && i == 0 && j == 0 && match_type == MatchType::Host {
                widen_host_regex(&matcher.regex)
            } else {
                matcher.regex.clone()
            };
            matchers.push(RequestMatcher::new(
                match_type,
                &regex,
                matcher.target.as_deref(),
            )?);
        }
        builder = builder.match_set(ds_id, matchers);
    }
    Ok(builder)
}

fn build_steering(json: &SteeringJson) -> Result<Steering, DomainError> {
    let targets = json
        .targets
        .iter()
        .map(|t| SteeringTarget::new(&t.delivery_service, t.weight, t.order))
        .collect();

    let mut steering = Steering::new(&json.delivery_service, targets);
    for filter in &json.filters {
        steering = steering.with_filter(&filter.pattern, &filter.delivery_service)?;
    }
    Ok(steering)
}
