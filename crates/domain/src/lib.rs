//! Traffic Router Domain Layer
pub mod access_record;
pub mod cache;
pub mod cache_location;
pub mod cache_register;
pub mod config;
pub mod delivery_service;
pub mod delivery_service_matcher;
pub mod errors;
pub mod geolocation;
pub mod hash;
pub mod network_node;
pub mod request;
pub mod request_matcher;
pub mod steering;
pub mod track;

pub use access_record::{AccessRecord, AnswerSummary, QuestionSummary};
pub use cache::{Cache, DeliveryServiceReference, InetRecord, DEFAULT_HASH_COUNT};
pub use cache_location::{CacheLocation, LocalizationMethod};
pub use cache_register::{CacheRegister, CacheRegisterBuilder, RoutingSettings};
pub use config::{CliOverrides, Config, ConfigError, DnsConfig};
pub use delivery_service::{DeliveryService, Dispersion, Ttls};
pub use delivery_service_matcher::DeliveryServiceMatcher;
pub use errors::DomainError;
pub use geolocation::Geolocation;
pub use network_node::{NetworkNode, NetworkTable};
pub use request::{DnsRequest, HttpRequest, IpVersion, QueryType, Request};
pub use request_matcher::{MatchType, RequestMatcher};
pub use steering::{Steering, SteeringTarget, STEERING_OPTION_HEADER};
pub use track::{ResultDetails, ResultType, Track};
