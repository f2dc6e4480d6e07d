mod dns;
mod errors;
mod logging;
mod root;
mod routing;
mod server;

pub use dns::DnsConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use routing::RoutingConfig;
pub use server::ServerConfig;
