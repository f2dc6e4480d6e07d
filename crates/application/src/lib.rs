//! Traffic Router Application Layer
pub mod ports;
pub mod services;
