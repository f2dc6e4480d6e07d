use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::hash::{DefaultHashable, Hashable};

pub const DEFAULT_HASH_COUNT: usize = 1000;

/// Which hostname a cache serves a delivery service under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryServiceReference {
    pub delivery_service_id: String,
    pub fqdn: String,
}

/// Address answered for a cache in a DNS response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InetRecord {
    pub address: IpAddr,
    pub ttl: u32,
}

/// An edge cache. Identity is the cache id alone.
#[derive(Debug, Clone)]
pub struct Cache {
    id: String,
    location_id: String,
    fqdn: String,
    port: u16,
    ip4: Option<Ipv4Addr>,
    ip6: Option<Ipv6Addr>,
    hash_id: String,
    hash_count: usize,
    hashable: DefaultHashable,
    delivery_services: HashMap<String, DeliveryServiceReference>,
}

impl Cache {
    pub fn new(id: &str, location_id: &str) -> Self {
        Self {
            id: id.to_string(),
            location_id: location_id.to_string(),
            fqdn: id.to_string(),
            port: 80,
            ip4: None,
            ip6: None,
            hash_id: id.to_string(),
            hash_count: DEFAULT_HASH_COUNT,
            hashable: DefaultHashable::generate_hashes(id, DEFAULT_HASH_COUNT),
            delivery_services: HashMap::new(),
        }
    }

    pub fn with_fqdn(mut self, fqdn: &str) -> Self {
        self.fqdn = fqdn.to_ascii_lowercase();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_ip4(mut self, ip: Option<Ipv4Addr>) -> Self {
        self.ip4 = ip;
        self
    }

    pub fn with_ip6(mut self, ip: Option<Ipv6Addr>) -> Self {
        self.ip6 = ip;
        self
    }

    /// Regenerates ring positions; a count of zero leaves the cache
    /// selectable only by `order`.
    pub fn with_hashing(mut self, hash_id: &str, hash_count: usize) -> Self {
        self.hash_id = hash_id.to_string();
        self.hash_count = hash_count;
        self.hashable = DefaultHashable::generate_hashes(hash_id, hash_count);
        self
    }

    pub fn with_delivery_service(mut self, delivery_service_id: &str, fqdn: &str) -> Self {
        self.delivery_services.insert(
            delivery_service_id.to_string(),
            DeliveryServiceReference {
                delivery_service_id: delivery_service_id.to_string(),
                fqdn: fqdn.to_ascii_lowercase(),
            },
        );
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ip4(&self) -> Option<Ipv4Addr> {
        self.ip4
    }

    pub fn ip6(&self) -> Option<Ipv6Addr> {
        self.ip6
    }

    pub fn hash_id(&self) -> &str {
        &self.hash_id
    }

    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    pub fn has_delivery_service(&self, delivery_service_id: &str) -> bool {
        self.delivery_services.contains_key(delivery_service_id)
    }

    pub fn delivery_service_reference(
        &self,
        delivery_service_id: &str,
    ) -> Option<&DeliveryServiceReference> {
        self.delivery_services.get(delivery_service_id)
    }

    pub fn delivery_services(&self) -> impl Iterator<Item = &DeliveryServiceReference> {
        self.delivery_services.values()
    }
}

impl Hashable for Cache {
    fn hash_values(&self) -> &[f64] {
        self.hashable.hash_values()
    }
}

impl PartialEq for Cache {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Cache {}

impl Hash for Cache {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_is_id() {
        let a = Cache::new("edge-1", "loc-a").with_port(8080);
        let b = Cache::new("edge-1", "loc-b");
        assert_eq!(a, b);
        let set: HashSet<Cache> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_default_hashing_uses_id() {
        let cache = Cache::new("edge-1", "loc");
        assert_eq!(cache.hash_id(), "edge-1");
        assert_eq!(cache.hash_values().len(), DEFAULT_HASH_COUNT);
    }

    #[test]
    fn test_custom_hashing() {
        let cache = Cache::new("edge-1", "loc").with_hashing("shared-id", 10);
        let twin = Cache::new("edge-2", "loc").with_hashing("shared-id", 10);
        assert_eq!(cache.hash_values(), twin.hash_values());
        assert!(!Cache::new("z", "loc").with_hashing("z", 0).has_hashes());
    }

    #[test]
    fn test_delivery_service_reference() {
        let cache = Cache::new("edge-1", "loc").with_delivery_service("ds-1", "Edge-1.DS.example.com");
        assert!(cache.has_delivery_service("ds-1"));
        assert_eq!(
            cache.delivery_service_reference("ds-1").map(|r| r.fqdn.as_str()),
            Some("edge-1.ds.example.com")
        );
        assert!(cache.delivery_service_reference("ds-2").is_none());
    }
}
