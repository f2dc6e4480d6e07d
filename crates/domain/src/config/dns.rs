use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits for the DNS protocol executor and transports.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Queries allowed to wait for a free worker. Zero rejects a query
    /// whenever another one is already waiting.
    #[serde(default)]
    pub queue_depth: usize,

    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    #[serde(default = "default_tcp_read_timeout_ms")]
    pub tcp_read_timeout_ms: u64,

    /// Payload size advertised in OPT records of responses.
    #[serde(default = "default_max_udp_payload")]
    pub max_udp_payload: u16,
}

impl DnsConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn tcp_read_timeout(&self) -> Duration {
        Duration::from_millis(self.tcp_read_timeout_ms)
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            queue_depth: 0,
            task_timeout_ms: default_task_timeout_ms(),
            tcp_read_timeout_ms: default_tcp_read_timeout_ms(),
            max_udp_payload: default_max_udp_payload(),
        }
    }
}

fn default_worker_threads() -> usize {
    64
}

fn default_task_timeout_ms() -> u64 {
    5000
}

fn default_tcp_read_timeout_ms() -> u64 {
    3000
}

fn default_max_udp_payload() -> u16 {
    4096
}
