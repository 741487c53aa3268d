use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::runtime::Builder;
use tracing::info;
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

use footfall::config::{self, Config};
use footfall::runner::{Runner, Summary};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("Failed to load footfall config: {0}")]
    Config(#[from] config::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed to install prometheus exporter: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

fn default_config_path() -> String {
    "/etc/footfall/footfall.yaml".to_string()
}

#[derive(Parser, Debug)]
struct Cli {
    /// Path to the footfall config yaml
    #[arg(long, default_value_t = default_config_path())]
    config_path: String,
    /// Override the configured number of visits
    #[arg(long)]
    visits: Option<u32>,
    /// Serve prometheus metrics on this address
    #[arg(long)]
    prometheus_addr: Option<SocketAddr>,
}

async fn inner_main(
    config: Config,
    prometheus_addr: Option<SocketAddr>,
) -> Result<Summary, Error> {
    if let Some(addr) = prometheus_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
    }
    Ok(Runner::new(config).run().await)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting footfall {version} run.");

    let cli = Cli::parse();
    let mut config = Config::from_path(&PathBuf::from(&cli.config_path))?;
    if let Some(visits) = cli.visits {
        config.visits = visits;
    }

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let summary = runtime.block_on(inner_main(config, cli.prometheus_addr))?;

    // Individual visit failures are logged and tallied, never an exit code.
    info!(
        completed = summary.completed,
        dropped = summary.dropped,
        abandoned = summary.abandoned,
        failed = summary.failed,
        "All visits attempted."
    );
    Ok(())
}
