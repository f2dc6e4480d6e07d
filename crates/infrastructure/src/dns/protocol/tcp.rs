//! DNS over TCP (RFC 1035 §4.2.2).
//!
//! Each connection carries one query framed with a two-byte big-endian
//! length prefix. The response uses the same framing and the connection is
//! closed afterwards.

use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::executor::{ProtocolExecutor, ProtocolTask};
use super::{query, ProtocolError, Transport};
use crate::dns::NameServer;

pub const MAX_TCP_MESSAGE_SIZE: usize = 65535;

pub struct TcpTransport {
    listener: TcpListener,
    name_server: Arc<NameServer>,
    executor: Arc<ProtocolExecutor>,
    read_timeout: Duration,
    shutdown: CancellationToken,
}

impl TcpTransport {
    pub fn new(
        listener: TcpListener,
        name_server: Arc<NameServer>,
        executor: Arc<ProtocolExecutor>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            listener,
            name_server,
            executor,
            read_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn run(self: Arc<Self>) {
        let local = self.listener.local_addr().ok();
        info!(bind_address = ?local, "TCP DNS listener started");

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, client)) => {
                    let task = TcpQueryTask {
                        stream: Some(stream),
                        client,
                        name_server: self.name_server.clone(),
                        read_timeout: self.read_timeout,
                    };
                    self.executor.submit(task);
                }
                Err(e) => {
                    error!(error = %e, "TCP accept error");
                }
            }
        }

        info!(bind_address = ?local, "TCP DNS listener stopped");
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn max_response_length(&self, _query: Option<&Message>) -> usize {
        MAX_TCP_MESSAGE_SIZE
    }
}

struct TcpQueryTask {
    stream: Option<TcpStream>,
    client: SocketAddr,
    name_server: Arc<NameServer>,
    read_timeout: Duration,
}

#[async_trait]
impl ProtocolTask for TcpQueryTask {
    async fn run(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let payload = match tokio::time::timeout(self.read_timeout, read_frame(stream)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                debug!(client = %self.client, error = %e, "Failed to read TCP query");
                return;
            }
            Err(_) => {
                debug!(client = %self.client, error = %ProtocolError::ReadTimeout, "Failed to read TCP query");
                return;
            }
        };

        let response = match query(&self.name_server, self.client.ip(), &payload, |_| {
            MAX_TCP_MESSAGE_SIZE
        }) {
            Ok(response) => response,
            Err(e) => {
                debug!(client = %self.client, error = %e, "Closing TCP connection without response");
                return;
            }
        };

        if let Err(e) = write_frame(stream, &response).await {
            debug!(client = %self.client, error = %e, "Failed to send TCP response");
        }
    }

    fn cleanup(&mut self) {
        if self.stream.take().is_some() {
            debug!(client = %self.client, "TCP connection closed");
        }
    }
}

pub async fn write_frame<S>(stream: &mut S, message_bytes: &[u8]) -> Result<(), ProtocolError>
where
    S: AsyncWriteExt + Unpin,
{
    if message_bytes.len() > MAX_TCP_MESSAGE_SIZE {
        return Err(ProtocolError::FrameTooLarge(message_bytes.len()));
    }
    let length = message_bytes.len() as u16;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(message_bytes).await?;
    stream.flush().await?;

    Ok(())
}

pub async fn read_frame<S>(stream: &mut S) -> Result<Vec<u8>, ProtocolError>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let message_len = u16::from_be_bytes(len_buf) as usize;
    let mut message = vec![0u8; message_len];
    stream.read_exact(&mut message).await?;

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_round_trip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"hello").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap();

        assert_eq!(frame, b"hello");
    }

    #[tokio::test]
    async fn test_read_frame_rejects_short_body() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[0, 10, 1, 2, 3]).await.unwrap();
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await,
            Err(ProtocolError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_write_frame_rejects_oversized_message() {
        let (mut client, _server) = tokio::io::duplex(16);
        let huge = vec![0u8; MAX_TCP_MESSAGE_SIZE + 1];

        assert!(matches!(
            write_frame(&mut client, &huge).await,
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }
}
