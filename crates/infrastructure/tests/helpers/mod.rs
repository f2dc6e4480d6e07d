#![allow(dead_code)]

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use traffic_router_application::ports::HealthPort;
use traffic_router_application::services::{CacheRegisterStore, TrafficRouter};
use traffic_router_domain::IpVersion;
use traffic_router_infrastructure::dns::{
    NameServer, ProtocolExecutor, TcpTransport, Transport, UdpTransport,
};
use traffic_router_infrastructure::health::MonitorHealth;
use traffic_router_infrastructure::loc::{CoverageZoneMap, NetworkGeolocation};
use traffic_router_infrastructure::snapshot::parse_cr_config;

pub const VIDEO_NAME: &str = "edge.video.cdn.test.";

/// CRConfig with one delivery service served by `cache_count` Denver caches.
pub fn cr_config(cache_count: usize) -> Value {
    let mut servers = Map::new();
    for n in 1..=cache_count {
        let id = format!("edge-den-{n}");
        servers.insert(
            id.clone(),
            json!({
                "locationId": "us-co-denver",
                "fqdn": id,
                "port": 80,
                "ip": format!("10.0.{}.{}", n / 250, n % 250 + 1),
                "ip6": format!("2001:db8::{:x}/64", n),
                "hashCount": 100,
                "deliveryServices": { "video": [format!("{id}.video.cdn.test")] }
            }),
        );
    }

    json!({
        "config": { "domain_name": "cdn.test", "consistent.dns.routing": "false" },
        "edgeLocations": {
            "us-co-denver": {
                "latitude": 39.74, "longitude": -104.99,
                "localizationMethods": ["CZ", "GEO"]
            },
            "us-il-chicago": { "latitude": 41.88, "longitude": -87.63 }
        },
        "contentServers": servers,
        "deliveryServices": {
            "video": {
                "matchsets": [{
                    "protocol": "DNS",
                    "matchlist": [{ "regex": ".*\\.video\\.cdn\\.test", "match-type": "HOST" }]
                }],
                "routingName": "edge",
                "domains": ["video.cdn.test"],
                "ttls": { "A": 30, "AAAA": 60 },
                "ip6RoutingEnabled": true
            }
        }
    })
}

pub const LOOPBACK_ZONE: &str = r#"{
    "coverageZones": {
        "us-co-denver": { "network": ["127.0.0.0/8"], "network6": ["::1/128"] }
    }
}"#;

pub fn name_server(cache_count: usize) -> Arc<NameServer> {
    name_server_with_health(cache_count, Arc::new(MonitorHealth::empty()))
}

pub fn name_server_with_health(cache_count: usize, health: Arc<dyn HealthPort>) -> Arc<NameServer> {
    let register = parse_cr_config(&cr_config(cache_count).to_string()).unwrap();
    let router = TrafficRouter::new(
        Arc::new(CacheRegisterStore::new(register)),
        health,
        Arc::new(CoverageZoneMap::from_json(LOOPBACK_ZONE).unwrap()),
        Arc::new(NetworkGeolocation::empty()),
    );
    Arc::new(NameServer::new(Arc::new(router), 1232))
}

/// Health source that fails every lookup by panicking.
pub struct BrokenHealth;

impl HealthPort for BrokenHealth {
    fn is_cache_available(&self, _cache_id: &str, _version: IpVersion) -> bool {
        panic!("health state unavailable")
    }

    fn is_delivery_service_available(&self, _delivery_service_id: &str) -> bool {
        panic!("health state unavailable")
    }

    fn is_location_available(&self, _delivery_service_id: &str, _location_id: &str) -> bool {
        panic!("health state unavailable")
    }
}

pub fn executor() -> Arc<ProtocolExecutor> {
    Arc::new(ProtocolExecutor::new(4, 16, Duration::from_secs(2)))
}

pub async fn start_udp(cache_count: usize) -> (SocketAddr, Arc<UdpTransport>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let transport = Arc::new(UdpTransport::new(socket, name_server(cache_count), executor()));
    let addr = transport.local_addr().unwrap();
    tokio::spawn(transport.clone().run());
    (addr, transport)
}

pub async fn start_tcp(cache_count: usize) -> (SocketAddr, Arc<TcpTransport>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let transport = Arc::new(TcpTransport::new(
        listener,
        name_server(cache_count),
        executor(),
        Duration::from_millis(500),
    ));
    let addr = transport.local_addr().unwrap();
    tokio::spawn(transport.clone().run());
    (addr, transport)
}

pub fn query_message(id: u16, name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(Name::from_ascii(name).unwrap(), record_type));
    message
}

pub fn query_bytes(id: u16, name: &str, record_type: RecordType) -> Vec<u8> {
    query_message(id, name, record_type).to_vec().unwrap()
}

pub fn edns_query_bytes(id: u16, name: &str, record_type: RecordType, payload: u16) -> Vec<u8> {
    let mut message = query_message(id, name, record_type);
    let mut edns = Edns::new();
    edns.set_max_payload(payload);
    message.set_edns(edns);
    message.to_vec().unwrap()
}
