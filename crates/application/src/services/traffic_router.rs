use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::{debug, warn};
use traffic_router_domain::hash::{select_hashable, select_hashables};
use traffic_router_domain::{
    Cache, CacheLocation, CacheRegister, DeliveryService, DnsRequest, Geolocation, HttpRequest,
    InetRecord, IpVersion, LocalizationMethod, Request, ResultDetails, ResultType, Steering,
    SteeringTarget, Track, STEERING_OPTION_HEADER,
};

use super::{CacheRegisterStore, DnsRouteResult, HttpRouteResult};
use crate::ports::{CoverageZonePort, GeolocationPort, HealthPort};

/// Chooses caches for client requests.
///
/// Every call works against one snapshot of the cache register, so a
/// concurrent publish never mixes two configurations in a single decision.
pub struct TrafficRouter {
    registers: Arc<CacheRegisterStore>,
    health: Arc<dyn HealthPort>,
    coverage_zones: Arc<dyn CoverageZonePort>,
    geolocation: Arc<dyn GeolocationPort>,
}

impl TrafficRouter {
    pub fn new(
        registers: Arc<CacheRegisterStore>,
        health: Arc<dyn HealthPort>,
        coverage_zones: Arc<dyn CoverageZonePort>,
        geolocation: Arc<dyn GeolocationPort>,
    ) -> Self {
        Self {
            registers,
            health,
            coverage_zones,
            geolocation,
        }
    }

    pub fn register(&self) -> Arc<CacheRegister> {
        self.registers.load()
    }

    fn with_snapshot<R>(&self, f: impl FnOnce(&Routing<'_>) -> R) -> R {
        let register = self.registers.load();
        let routing = Routing {
            register: register.as_ref(),
            health: self.health.as_ref(),
            coverage_zones: self.coverage_zones.as_ref(),
            geolocation: self.geolocation.as_ref(),
        };
        f(&routing)
    }

    pub fn route_dns(&self, request: &DnsRequest) -> DnsRouteResult {
        self.with_snapshot(|routing| routing.route_dns(request))
    }

    pub fn route_http(&self, request: &HttpRequest) -> HttpRouteResult {
        self.with_snapshot(|routing| routing.route_http(request))
    }

    /// Caches at `location_id` able to serve the delivery service.
    pub fn select_caches_by_cz(
        &self,
        delivery_service_id: &str,
        location_id: &str,
        request: &Request,
    ) -> Option<Vec<Arc<Cache>>> {
        self.with_snapshot(|routing| {
            let ds = routing.register.delivery_service(delivery_service_id)?;
            let location = routing.register.cache_location(location_id);
            routing.select_caches_by_cz(
                ds,
                location.map(|l| l.as_ref()),
                request.ip_version(),
                &mut Track::new(),
            )
        })
    }

    pub fn coverage_zone_cache_location(
        &self,
        ip: IpAddr,
        delivery_service_id: &str,
    ) -> Option<Arc<CacheLocation>> {
        self.with_snapshot(|routing| {
            let ds = routing.register.delivery_service(delivery_service_id)?;
            routing.coverage_zone_location(ip, ds, IpVersion::of(ip), &mut Track::new())
        })
    }

    pub fn consistent_hash_for_coverage_zone(
        &self,
        ip: IpAddr,
        delivery_service_id: &str,
        path: &str,
    ) -> Option<Arc<Cache>> {
        self.with_snapshot(|routing| {
            let Some(ds) = routing.register.delivery_service(delivery_service_id) else {
                warn!(delivery_service = %delivery_service_id, "Delivery service not in cache register");
                return None;
            };
            let version = IpVersion::of(ip);
            let mut track = Track::new();
            let location = routing.coverage_zone_location(ip, ds, version, &mut track);
            let caches =
                routing.select_caches_by_cz(ds, location.as_deref(), version, &mut track)?;
            routing.pick_cache(ds, &caches, &ds.consistent_hash_key(&path_request(ip, path)))
        })
    }

    pub fn consistent_hash_for_geolocation(
        &self,
        ip: IpAddr,
        delivery_service_id: &str,
        path: &str,
    ) -> Option<Arc<Cache>> {
        self.with_snapshot(|routing| {
            let Some(ds) = routing.register.delivery_service(delivery_service_id) else {
                warn!(delivery_service = %delivery_service_id, "Delivery service not in cache register");
                return None;
            };
            let version = IpVersion::of(ip);
            let mut track = Track::new();
            let location = routing.coverage_zone_location(ip, ds, version, &mut track);
            let caches =
                routing.select_caches_by_geo(ip, ds, location.as_deref(), version, &mut track)?;
            routing.pick_cache(ds, &caches, &ds.consistent_hash_key(&path_request(ip, path)))
        })
    }

    /// The delivery service that should serve `path`: a steering target for
    /// steering services, the service itself otherwise.
    pub fn consistent_hash_delivery_service(
        &self,
        delivery_service_id: &str,
        path: &str,
    ) -> Option<Arc<DeliveryService>> {
        self.with_snapshot(|routing| {
            let ds = routing.register.delivery_service(delivery_service_id)?;
            match routing.register.steering(delivery_service_id) {
                Some(steering) => routing
                    .steer(ds, steering, &path_request(unspecified(), path))
                    .map(|steered| steered.target),
                None => Some(ds.clone()),
            }
        })
    }

    /// Locations the delivery service has not disabled.
    pub fn filter_available_cache_locations(
        &self,
        delivery_service_id: &str,
    ) -> Vec<Arc<CacheLocation>> {
        self.with_snapshot(|routing| routing.available_locations(delivery_service_id))
    }
}

fn unspecified() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn path_request(ip: IpAddr, path: &str) -> HttpRequest {
    HttpRequest::new(ip, "", path)
}

fn order_by_distance(
    mut locations: Vec<Arc<CacheLocation>>,
    client: &Geolocation,
) -> Vec<Arc<CacheLocation>> {
    locations.sort_by(|a, b| {
        a.geolocation()
            .distance_from(client)
            .total_cmp(&b.geolocation().distance_from(client))
    });
    locations
}

fn cache_url(ds: &DeliveryService, cache: &Cache, request: &HttpRequest) -> String {
    let host = cache
        .delivery_service_reference(ds.id())
        .map(|r| r.fqdn.as_str())
        .unwrap_or_else(|| cache.fqdn());

    let mut url = if request.secure {
        format!("https://{host}")
    } else if cache.port() == 80 {
        format!("http://{host}")
    } else {
        format!("http://{host}:{}", cache.port())
    };
    url.push_str(&request.uri());
    url
}

/// Where a steering service sent a request.
struct Steered {
    target: Arc<DeliveryService>,
    /// Chosen on the steering ring rather than by bypass or explicit option.
    hashed: bool,
}

struct Routing<'a> {
    register: &'a CacheRegister,
    health: &'a dyn HealthPort,
    coverage_zones: &'a dyn CoverageZonePort,
    geolocation: &'a dyn GeolocationPort,
}

impl Routing<'_> {
    fn route_dns(&self, request: &DnsRequest) -> DnsRouteResult {
        let mut track = Track::new();
        let generic = Request::Dns(request.clone());

        let Some(ds) = self.register.delivery_service_for(&generic).cloned() else {
            track.set_result(ResultType::StaticRoute);
            track.set_details(ResultDetails::DsNotFound);
            return DnsRouteResult {
                delivery_service: None,
                addresses: Vec::new(),
                track,
            };
        };
        track.delivery_service_id = Some(ds.id().to_string());

        let addresses = self.edge_cache_addresses(request, &generic, &ds, &mut track);
        DnsRouteResult {
            delivery_service: Some(ds),
            addresses,
            track,
        }
    }

    fn edge_cache_addresses(
        &self,
        request: &DnsRequest,
        generic: &Request,
        ds: &DeliveryService,
        track: &mut Track,
    ) -> Vec<InetRecord> {
        if !ds.is_dns() || !ds.accepts_routing_name(&request.hostname) {
            track.set_result(ResultType::DsMiss);
            return Vec::new();
        }

        if !self.health.is_delivery_service_available(ds.id()) {
            track.set_result(ResultType::Miss);
            track.set_details(ResultDetails::DsNotAvailable);
            return Vec::new();
        }

        let version = generic.ip_version();
        let location = self.coverage_zone_location(request.client_ip, ds, version, track);
        if let Some(caches) = self.select_caches_by_cz(ds, location.as_deref(), version, track) {
            return self.inet_records(ds, caches, &request.hostname);
        }

        if ds.is_coverage_zone_only() {
            track.set_result(ResultType::Miss);
            track.set_details(ResultDetails::DsCzOnly);
            return Vec::new();
        }

        let caches = if track.continue_geo {
            self.select_caches_by_geo(request.client_ip, ds, location.as_deref(), version, track)
        } else {
            None
        };

        match caches {
            Some(caches) => {
                track.set_result(ResultType::Geo);
                self.inet_records(ds, caches, &request.hostname)
            }
            None => {
                track.set_result(ResultType::Miss);
                Vec::new()
            }
        }
    }

    fn route_http(&self, request: &HttpRequest) -> HttpRouteResult {
        let mut track = Track::new();
        let generic = Request::Http(request.clone());

        let mut result = HttpRouteResult {
            delivery_service: None,
            cache: None,
            url: None,
            track: Track::new(),
        };

        let Some(requested) = self.register.delivery_service_for(&generic).cloned() else {
            track.set_result(ResultType::DsMiss);
            track.set_details(ResultDetails::DsNotFound);
            result.track = track;
            return result;
        };

        let (ds, hash_key) = match self.register.steering(requested.id()) {
            Some(steering) => match self.steer(&requested, steering, request) {
                Some(Steered {
                    target,
                    hashed: true,
                }) => {
                    let key = target.steered_hash_key(&requested, request);
                    (target, key)
                }
                Some(Steered { target, .. }) => {
                    let key = target.consistent_hash_key(request);
                    (target, key)
                }
                None => {
                    track.set_result(ResultType::Miss);
                    track.set_details(ResultDetails::DsNotFound);
                    result.delivery_service = Some(requested);
                    result.track = track;
                    return result;
                }
            },
            None => {
                let key = requested.consistent_hash_key(request);
                (requested, key)
            }
        };
        track.delivery_service_id = Some(ds.id().to_string());
        result.delivery_service = Some(ds.clone());

        if !self.health.is_delivery_service_available(ds.id()) {
            track.set_result(ResultType::Miss);
            track.set_details(ResultDetails::DsNotAvailable);
            result.track = track;
            return result;
        }

        if let Some(caches) = self.select_caches(&generic, &ds, &mut track) {
            if let Some(cache) = self.pick_cache(&ds, &caches, &hash_key) {
                result.url = Some(cache_url(&ds, &cache, request));
                result.cache = Some(cache);
            }
        }

        result.track = track;
        result
    }

    fn select_caches(
        &self,
        request: &Request,
        ds: &DeliveryService,
        track: &mut Track,
    ) -> Option<Vec<Arc<Cache>>> {
        let version = request.ip_version();
        let location = self.coverage_zone_location(request.client_ip(), ds, version, track);

        if let Some(caches) = self.select_caches_by_cz(ds, location.as_deref(), version, track) {
            return Some(caches);
        }

        if ds.is_coverage_zone_only() {
            track.set_result(ResultType::Miss);
            track.set_details(ResultDetails::DsCzOnly);
            return None;
        }

        if !track.continue_geo {
            return None;
        }

        self.select_caches_by_geo(request.client_ip(), ds, location.as_deref(), version, track)
    }

    fn pick_cache(
        &self,
        ds: &DeliveryService,
        caches: &[Arc<Cache>],
        key: &str,
    ) -> Option<Arc<Cache>> {
        select_hashable(caches, Some(ds.dispersion()), key).cloned()
    }

    fn steer(
        &self,
        ds: &DeliveryService,
        steering: &Steering,
        request: &HttpRequest,
    ) -> Option<Steered> {
        if let Some(option) = request
            .header(STEERING_OPTION_HEADER)
            .filter(|o| !o.is_empty())
        {
            if !steering.has_target(option) {
                debug!(delivery_service = %ds.id(), option = %option, "Steering option is not a target");
                return None;
            }
            return self.register.delivery_service(option).map(|target| Steered {
                target: target.clone(),
                hashed: false,
            });
        }

        if let Some(bypass) = steering.bypass_destination(&request.path) {
            // A bypass not yet in the snapshot falls through to the targets.
            if let Some(target) = self.register.delivery_service(bypass) {
                return Some(Steered {
                    target: target.clone(),
                    hashed: false,
                });
            }
        }

        let targets: Vec<&SteeringTarget> = steering
            .targets()
            .iter()
            .filter(|t| self.register.delivery_service(t.delivery_service_id()).is_some())
            .collect();

        let key = ds.consistent_hash_key(request);
        let target = select_hashable(&targets, Some(ds.dispersion()), &key)?;
        self.register
            .delivery_service(target.delivery_service_id())
            .map(|target| Steered {
                target: target.clone(),
                hashed: true,
            })
    }

    fn supporting_caches(
        &self,
        caches: &[Arc<Cache>],
        ds: &DeliveryService,
        version: IpVersion,
    ) -> Vec<Arc<Cache>> {
        caches
            .iter()
            .filter(|c| {
                c.has_delivery_service(ds.id()) && self.health.is_cache_available(c.id(), version)
            })
            .cloned()
            .collect()
    }

    fn has_supporting_caches(
        &self,
        location: &CacheLocation,
        ds: &DeliveryService,
        version: IpVersion,
    ) -> bool {
        location.caches().iter().any(|c| {
            c.has_delivery_service(ds.id()) && self.health.is_cache_available(c.id(), version)
        })
    }

    fn available_locations(&self, delivery_service_id: &str) -> Vec<Arc<CacheLocation>> {
        self.register
            .cache_locations()
            .filter(|l| self.health.is_location_available(delivery_service_id, l.id()))
            .cloned()
            .collect()
    }

    fn closest_location(
        &self,
        locations: Vec<Arc<CacheLocation>>,
        client: &Geolocation,
        ds: &DeliveryService,
        version: IpVersion,
    ) -> Option<Arc<CacheLocation>> {
        order_by_distance(locations, client)
            .into_iter()
            .find(|l| self.has_supporting_caches(l, ds, version))
    }

    fn coverage_zone_location(
        &self,
        ip: IpAddr,
        ds: &DeliveryService,
        version: IpVersion,
        track: &mut Track,
    ) -> Option<Arc<CacheLocation>> {
        let node = self.coverage_zones.network_node(ip)?;
        let loc_id = node.loc.as_deref()?;

        if let Some(location) = self.register.cache_location(loc_id) {
            if !location.is_enabled_for(LocalizationMethod::CoverageZone) {
                track.continue_geo = false;
                return None;
            }

            if self.has_supporting_caches(location, ds, version) {
                return Some(location.clone());
            }

            if !location.backup_cache_groups().is_empty() {
                for group in location.backup_cache_groups() {
                    let Some(backup) = self.register.cache_location(group) else {
                        continue;
                    };
                    if !backup.is_enabled_for(LocalizationMethod::CoverageZone) {
                        continue;
                    }
                    if self.has_supporting_caches(backup, ds, version) {
                        debug!(
                            backup = %backup.id(),
                            client = %ip,
                            delivery_service = %ds.id(),
                            "Using backup coverage zone cache group"
                        );
                        track.from_backup_cz_group = true;
                        return Some(backup.clone());
                    }
                }

                if !location.use_closest_geo_on_backup_failure() {
                    track.continue_geo = false;
                    return None;
                }
            }
        }

        let client = node.geolocation.as_ref()?;
        let candidates: Vec<Arc<CacheLocation>> = self
            .available_locations(ds.id())
            .into_iter()
            .filter(|l| l.is_enabled_for(LocalizationMethod::CoverageZone))
            .collect();

        let closest = self.closest_location(candidates, client, ds, version);
        if let Some(location) = &closest {
            debug!(
                location = %location.id(),
                client = %ip,
                delivery_service = %ds.id(),
                "Using closest coverage zone cache group"
            );
            track.from_backup_cz_group = true;
        }
        closest
    }

    fn select_caches_by_cz(
        &self,
        ds: &DeliveryService,
        location: Option<&CacheLocation>,
        version: IpVersion,
        track: &mut Track,
    ) -> Option<Vec<Arc<Cache>>> {
        let location = location?;
        if !self.health.is_location_available(ds.id(), location.id()) {
            return None;
        }

        let caches = self.supporting_caches(location.caches(), ds, version);
        if caches.is_empty() {
            return None;
        }

        track.set_result(ResultType::Cz);
        track.result_location = Some(*location.geolocation());
        Some(caches)
    }

    fn select_caches_by_geo(
        &self,
        ip: IpAddr,
        ds: &DeliveryService,
        cz_location: Option<&CacheLocation>,
        version: IpVersion,
        track: &mut Track,
    ) -> Option<Vec<Arc<Cache>>> {
        let client = match cz_location {
            Some(location) => Some(*location.geolocation()),
            None => self
                .geolocation
                .location(ip)
                .or_else(|| ds.miss_location().copied()),
        };

        let Some(client) = client else {
            track.set_details(ResultDetails::DsClientGeoUnsupported);
            return None;
        };

        track.set_result(ResultType::Geo);
        let caches = self.caches_by_geo(ds, &client, version, track);
        if caches.is_none() {
            track.set_details(ResultDetails::GeoNoCacheFound);
        }
        caches
    }

    /// Caches of the nearest location that can serve `ds`, trying at most
    /// `location_failover_limit` locations when that limit is set.
    fn caches_by_geo(
        &self,
        ds: &DeliveryService,
        client: &Geolocation,
        version: IpVersion,
        track: &mut Track,
    ) -> Option<Vec<Arc<Cache>>> {
        let limit = ds.location_failover_limit();
        let locations: Vec<Arc<CacheLocation>> = self
            .available_locations(ds.id())
            .into_iter()
            .filter(|l| l.is_enabled_for(LocalizationMethod::Geo))
            .collect();

        for (tested, location) in order_by_distance(locations, client).into_iter().enumerate() {
            let caches = self.supporting_caches(location.caches(), ds, version);
            if !caches.is_empty() {
                track.result_location = Some(*location.geolocation());
                return Some(caches);
            }
            if limit != 0 && tested + 1 >= limit {
                return None;
            }
        }

        None
    }

    fn inet_records(
        &self,
        ds: &DeliveryService,
        caches: Vec<Arc<Cache>>,
        hostname: &str,
    ) -> Vec<InetRecord> {
        let max_dns_ips = ds.max_dns_ips();

        let selected: Vec<Arc<Cache>> =
            if max_dns_ips > 0 && self.register.settings().consistent_dns_routing {
                select_hashables(&caches, Some(ds.dispersion()), hostname)
                    .into_iter()
                    .cloned()
                    .collect()
            } else if max_dns_ips > 0 {
                let mut shuffled = caches;
                fastrand::shuffle(&mut shuffled);
                shuffled.truncate(max_dns_ips);
                shuffled
            } else {
                caches
            };

        let ttls = ds.ttls();
        let mut records = Vec::with_capacity(selected.len() * 2);
        for cache in &selected {
            if let Some(ip4) = cache.ip4() {
                records.push(InetRecord {
                    address: IpAddr::V4(ip4),
                    ttl: ttls.a,
                });
            }
            if ds.is_ip6_routing_enabled() {
                if let Some(ip6) = cache.ip6() {
                    records.push(InetRecord {
                        address: IpAddr::V6(ip6),
                        ttl: ttls.aaaa,
                    });
                }
            }
        }
        records
    }
}
