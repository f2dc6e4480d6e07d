#![allow(dead_code)]

pub mod fixtures;
pub mod mock_ports;

pub use fixtures::*;
pub use mock_ports::*;
