//! DNS over UDP (RFC 1035 §4.2.1).
//!
//! Responses are limited to 512 bytes unless the query carries an EDNS(0)
//! OPT record advertising a larger payload. Oversized responses go out
//! truncated with TC set so the client retries over TCP.

use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::executor::{ProtocolExecutor, ProtocolTask};
use super::{query, Transport};
use crate::dns::NameServer;

pub const MIN_UDP_PAYLOAD: usize = 512;

const RECV_BUFFER_SIZE: usize = 65535;

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    name_server: Arc<NameServer>,
    executor: Arc<ProtocolExecutor>,
    shutdown: CancellationToken,
}

impl UdpTransport {
    pub fn new(
        socket: UdpSocket,
        name_server: Arc<NameServer>,
        executor: Arc<ProtocolExecutor>,
    ) -> Self {
        Self {
            socket: Arc::new(socket),
            name_server,
            executor,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

fn udp_max_response_length(query: Option<&Message>) -> usize {
    query
        .and_then(|q| q.extensions().as_ref())
        .map(|edns| usize::from(edns.max_payload()).max(MIN_UDP_PAYLOAD))
        .unwrap_or(MIN_UDP_PAYLOAD)
}

#[async_trait]
impl Transport for UdpTransport {
    async fn run(self: Arc<Self>) {
        let local = self.socket.local_addr().ok();
        info!(bind_address = ?local, "UDP DNS listener started");

        let mut recv_buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut recv_buf) => received,
            };

            match received {
                Ok((len, client)) => {
                    let task = UdpQueryTask {
                        socket: self.socket.clone(),
                        name_server: self.name_server.clone(),
                        client,
                        payload: recv_buf[..len].to_vec(),
                    };
                    self.executor.submit(task);
                }
                Err(e) => {
                    error!(error = %e, "UDP recv error");
                }
            }
        }

        info!(bind_address = ?local, "UDP DNS listener stopped");
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn max_response_length(&self, query: Option<&Message>) -> usize {
        udp_max_response_length(query)
    }
}

struct UdpQueryTask {
    socket: Arc<UdpSocket>,
    name_server: Arc<NameServer>,
    client: SocketAddr,
    payload: Vec<u8>,
}

#[async_trait]
impl ProtocolTask for UdpQueryTask {
    async fn run(&mut self) {
        let response = match query(
            &self.name_server,
            self.client.ip(),
            &self.payload,
            udp_max_response_length,
        ) {
            Ok(response) => response,
            Err(e) => {
                debug!(client = %self.client, error = %e, "Dropping UDP query");
                return;
            }
        };

        if let Err(e) = self.socket.send_to(&response, self.client).await {
            debug!(client = %self.client, error = %e, "Failed to send UDP response");
        }
    }
}
