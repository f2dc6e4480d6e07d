use clap::Parser;
use traffic_router_domain::CliOverrides;
use tracing::info;

mod bootstrap;
mod server;

#[derive(Parser)]
#[command(name = "traffic-router")]
#[command(version)]
#[command(about = "CDN traffic router - answers DNS queries with the edge caches that should serve each client")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// CRConfig snapshot path
    #[arg(short = 's', long, value_name = "FILE")]
    snapshot: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind,
        snapshot_path: cli.snapshot,
        log_level: cli.log_level,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting Traffic Router v{}", env!("CARGO_PKG_VERSION"));

    let router = bootstrap::build_router(&config.routing)?;
    server::run(&config, router).await?;

    info!("Server shutdown complete");
    Ok(())
}
