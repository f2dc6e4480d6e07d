pub mod cr_config;

pub use cr_config::{load_cr_config, parse_cr_config};
