mod cache_register_store;
mod route_result;
mod traffic_router;

pub use cache_register_store::CacheRegisterStore;
pub use route_result::{DnsRouteResult, HttpRouteResult};
pub use traffic_router::TrafficRouter;
