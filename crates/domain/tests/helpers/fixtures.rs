use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use traffic_router_domain::hash::select_hashable;
use traffic_router_domain::{Cache, HttpRequest};

pub fn client_ip() -> IpAddr {
    "192.168.1.100".parse().unwrap()
}

pub fn http_request(path: &str, query: &str) -> HttpRequest {
    HttpRequest::new(client_ip(), "ccr.ds.cdn.example.com", path).with_query(query)
}

pub fn weighted_cache(id: &str, hash_count: usize) -> Arc<Cache> {
    Arc::new(Cache::new(id, "loc").with_hashing(id, hash_count))
}

pub fn paths(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("/asset/{i}/segment.ts")).collect()
}

/// Keys each cache wins, by cache id.
pub fn assignments(caches: &[Arc<Cache>], keys: &[String], id: &str) -> HashSet<String> {
    keys.iter()
        .filter(|k| select_hashable(caches, None, k).map(|c| c.id()) == Some(id))
        .cloned()
        .collect()
}
