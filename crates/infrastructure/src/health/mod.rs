pub mod monitor_state;

pub use monitor_state::MonitorHealth;
