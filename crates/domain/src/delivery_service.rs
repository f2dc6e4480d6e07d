use fancy_regex::Regex;
use std::collections::{BTreeSet, HashSet};
use url::form_urlencoded;

use crate::{DomainError, Geolocation, HttpRequest};

/// How many of the best-ranked caches a response may spread over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispersion {
    limit: usize,
    shuffled: bool,
}

impl Dispersion {
    /// A limit below one is raised to one.
    pub fn new(limit: usize, shuffled: bool) -> Self {
        Self {
            limit: limit.max(1),
            shuffled,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }
}

impl Default for Dispersion {
    fn default() -> Self {
        Self::new(1, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttls {
    pub a: u32,
    pub aaaa: u32,
}

impl Default for Ttls {
    fn default() -> Self {
        Self { a: 3600, aaaa: 3600 }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryService {
    id: String,
    routing_name: String,
    domain: Option<String>,
    dns: bool,
    consistent_hash_regex: Option<Regex>,
    consistent_hash_query_params: HashSet<String>,
    dispersion: Dispersion,
    ttls: Ttls,
    coverage_zone_only: bool,
    miss_location: Option<Geolocation>,
    location_failover_limit: usize,
    max_dns_ips: usize,
    ip6_routing_enabled: bool,
    request_headers: Vec<String>,
    response_headers: Vec<(String, String)>,
}

impl DeliveryService {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            routing_name: "ccr".to_string(),
            domain: None,
            dns: false,
            consistent_hash_regex: None,
            consistent_hash_query_params: HashSet::new(),
            dispersion: Dispersion::default(),
            ttls: Ttls::default(),
            coverage_zone_only: false,
            miss_location: None,
            location_failover_limit: 0,
            max_dns_ips: 0,
            ip6_routing_enabled: false,
            request_headers: Vec::new(),
            response_headers: Vec::new(),
        }
    }

    pub fn with_routing_name(mut self, routing_name: &str) -> Self {
        self.routing_name = routing_name.to_ascii_lowercase();
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_ascii_lowercase());
        self
    }

    pub fn with_dns(mut self, dns: bool) -> Self {
        self.dns = dns;
        self
    }

    pub fn with_consistent_hash_regex(mut self, pattern: &str) -> Result<Self, DomainError> {
        if pattern.is_empty() {
            self.consistent_hash_regex = None;
            return Ok(self);
        }
        let regex = Regex::new(pattern).map_err(|e| DomainError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.consistent_hash_regex = Some(regex);
        Ok(self)
    }

    pub fn with_consistent_hash_query_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consistent_hash_query_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dispersion(mut self, dispersion: Dispersion) -> Self {
        self.dispersion = dispersion;
        self
    }

    pub fn with_ttls(mut self, ttls: Ttls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn with_coverage_zone_only(mut self, only: bool) -> Self {
        self.coverage_zone_only = only;
        self
    }

    pub fn with_miss_location(mut self, location: Option<Geolocation>) -> Self {
        self.miss_location = location;
        self
    }

    pub fn with_location_failover_limit(mut self, limit: usize) -> Self {
        self.location_failover_limit = limit;
        self
    }

    pub fn with_max_dns_ips(mut self, max: usize) -> Self {
        self.max_dns_ips = max;
        self
    }

    pub fn with_ip6_routing(mut self, enabled: bool) -> Self {
        self.ip6_routing_enabled = enabled;
        self
    }

    pub fn with_request_headers(mut self, headers: Vec<String>) -> Self {
        self.request_headers = headers;
        self
    }

    pub fn with_response_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.response_headers = headers;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn routing_name(&self) -> &str {
        &self.routing_name
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn is_dns(&self) -> bool {
        self.dns
    }

    pub fn dispersion(&self) -> &Dispersion {
        &self.dispersion
    }

    pub fn ttls(&self) -> Ttls {
        self.ttls
    }

    pub fn is_coverage_zone_only(&self) -> bool {
        self.coverage_zone_only
    }

    pub fn miss_location(&self) -> Option<&Geolocation> {
        self.miss_location.as_ref()
    }

    /// Zero means every location may be tried.
    pub fn location_failover_limit(&self) -> usize {
        self.location_failover_limit
    }

    /// Zero means every selected cache is answered.
    pub fn max_dns_ips(&self) -> usize {
        self.max_dns_ips
    }

    pub fn is_ip6_routing_enabled(&self) -> bool {
        self.ip6_routing_enabled
    }

    pub fn request_headers(&self) -> &[String] {
        &self.request_headers
    }

    pub fn response_headers(&self) -> &[(String, String)] {
        &self.response_headers
    }

    /// True when `hostname` is addressed to this service's routing name.
    pub fn accepts_routing_name(&self, hostname: &str) -> bool {
        hostname
            .strip_prefix(self.routing_name.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Concatenated capture groups of the consistent-hash regex applied to
    /// `path`, or `path` itself when there is no regex, no match or no groups.
    pub fn pattern_based_hash_string(&self, path: &str) -> String {
        let Some(regex) = &self.consistent_hash_regex else {
            return path.to_string();
        };
        if path.is_empty() {
            return path.to_string();
        }

        match regex.captures(path) {
            Ok(Some(captures)) if captures.len() > 1 => (1..captures.len())
                .filter_map(|i| captures.get(i))
                .map(|m| m.as_str())
                .collect(),
            _ => path.to_string(),
        }
    }

    /// Sorted `name=value` pairs of the configured query parameters,
    /// URL-decoded and concatenated.
    pub fn extract_significant_query_params(&self, query_string: Option<&str>) -> String {
        let Some(query) = query_string.filter(|q| !q.is_empty()) else {
            return String::new();
        };
        if self.consistent_hash_query_params.is_empty() {
            return String::new();
        }

        let mut significant = BTreeSet::new();
        for part in query.split('&').filter(|p| !p.is_empty()) {
            let Some((name, value)) = form_urlencoded::parse(part.as_bytes()).next() else {
                continue;
            };
            if !self.consistent_hash_query_params.contains(name.as_ref()) {
                continue;
            }
            if part.contains('=') {
                significant.insert(format!("{name}={value}"));
            } else {
                significant.insert(name.into_owned());
            }
        }
        significant.into_iter().collect()
    }

    /// Key that places an HTTP request on the hash ring.
    pub fn consistent_hash_key(&self, request: &HttpRequest) -> String {
        let mut key = self.pattern_based_hash_string(&request.path);
        key.push_str(&self.extract_significant_query_params(request.query_string.as_deref()));
        key
    }

    pub fn has_consistent_hash_regex(&self) -> bool {
        self.consistent_hash_regex.is_some()
    }

    /// Key for a request this service received from the steering service
    /// `steering`. The steering service's regex replaces this one when it
    /// has one; the query parameters are always this service's.
    pub fn steered_hash_key(&self, steering: &DeliveryService, request: &HttpRequest) -> String {
        let patterns = if steering.has_consistent_hash_regex() {
            steering
        } else {
            self
        };
        let mut key = patterns.pattern_based_hash_string(&request.path);
        key.push_str(&self.extract_significant_query_params(request.query_string.as_deref()));
        key
    }
}

impl PartialEq for DeliveryService {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DeliveryService {}
