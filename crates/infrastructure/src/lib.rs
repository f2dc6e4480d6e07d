pub mod dns;
pub mod health;
pub mod loc;
pub mod snapshot;
