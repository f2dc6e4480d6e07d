mod coverage_zone_port;
mod geolocation_port;
mod health_port;

pub use coverage_zone_port::CoverageZonePort;
pub use geolocation_port::GeolocationPort;
pub use health_port::HealthPort;
