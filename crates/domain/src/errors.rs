use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Invalid request matcher: {0}")]
    InvalidRequestMatcher(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR format: {0}")]
    InvalidCidr(String),

    #[error("Invalid geolocation: latitude={latitude}, longitude={longitude}")]
    InvalidGeolocation { latitude: f64, longitude: f64 },

    #[error("Delivery service not found: {0}")]
    DeliveryServiceNotFound(String),

    #[error("Cache location not found: {0}")]
    CacheLocationNotFound(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Routing failure: {0}")]
    Routing(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
