use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinSet;
use tracing::{error, info};
use traffic_router_application::services::TrafficRouter;
use traffic_router_domain::Config;
use traffic_router_infrastructure::dns::{
    NameServer, ProtocolExecutor, TcpTransport, Transport, UdpTransport,
};

/// Serves DNS over UDP and TCP until ctrl-c, then drains the executor.
pub async fn run(config: &Config, router: Arc<TrafficRouter>) -> anyhow::Result<()> {
    let bind: IpAddr = config.server.bind_address.parse()?;
    let socket_addr = SocketAddr::new(bind, config.server.dns_port);
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let name_server = Arc::new(NameServer::new(router, config.dns.max_udp_payload));
    let executor = Arc::new(ProtocolExecutor::from_config(&config.dns));

    let udp = Arc::new(UdpTransport::new(
        create_udp_socket(domain, socket_addr)?,
        name_server.clone(),
        executor.clone(),
    ));
    let tcp = Arc::new(TcpTransport::new(
        create_tcp_listener(domain, socket_addr)?,
        name_server,
        executor.clone(),
        config.dns.tcp_read_timeout(),
    ));

    info!(
        bind_address = %socket_addr,
        workers = config.dns.worker_threads,
        queue_depth = config.dns.queue_depth,
        task_timeout_ms = config.dns.task_timeout_ms,
        "DNS server ready"
    );

    let mut listeners: JoinSet<()> = JoinSet::new();
    listeners.spawn(udp.clone().run());
    listeners.spawn(tcp.clone().run());

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
        }
        _ = listeners.join_next() => {
            error!("DNS listener exited unexpectedly");
        }
    }

    udp.shutdown();
    tcp.shutdown();
    while listeners.join_next().await.is_some() {}

    executor.shutdown().await;
    info!(
        rejected = executor.rejected_count(),
        timed_out = executor.timed_out_count(),
        "DNS executor drained"
    );
    Ok(())
}

fn create_udp_socket(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
