pub mod coverage_zone;
pub mod geolocation;

pub use coverage_zone::CoverageZoneMap;
pub use geolocation::NetworkGeolocation;
