//! Hearth API Server
//!
//! Serves the hub's metrics to JSON time-series dashboards.
//!
//! Run with: cargo run -- --config ./config.toml
//!
//! # Configuration
//!
//! Loaded from the first of `--config`, `~/.config/hearth/config.toml`,
//! `/etc/hearth/config.toml` or `./config.toml`; environment variables
//! (`HEARTH_HUB_URL`, `HEARTH_HUB_TOKEN`, `HEARTH_API_HOST`,
//! `HEARTH_API_PORT`, `HEARTH_LOG_LEVEL`, ...) override file values, and
//! `RUST_LOG` overrides the log filter entirely.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hearth::api::{serve, ApiConfig, AppState};
use hearth::config::{generate_default_config, Config};
use hearth::hub::{HubClient, HubConfig};
use hearth::query::MetricResolver;

/// Hearth: hub metrics for time-series dashboards
#[derive(Debug, Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind the API server to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the API server to (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Print a sample config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    init_tracing(&config);

    tracing::info!("Starting Hearth v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Hub: {}", config.hub.base_url);

    // Bring up the hub session before accepting queries; a bad address or
    // token should fail here, not on the first dashboard refresh.
    let hub = HubClient::connect(HubConfig {
        base_url: config.hub.base_url.clone(),
        token: config.hub.token.clone(),
        request_timeout_ms: config.hub.request_timeout_ms,
    })
    .await
    .context("connecting to the hub")?;
    tracing::info!("Connection to the hub is all set up");

    let resolver = Arc::new(MetricResolver::new(
        Arc::new(hub),
        Duration::from_secs(config.catalog.ttl_secs),
    ));

    let api_config = ApiConfig::new(config.api.host.clone(), config.api.port);
    let state = AppState::new(resolver, api_config.clone());

    serve(state, &api_config).await?;

    tracing::info!("Hearth stopped");
    Ok(())
}

/// Initialize the tracing subscriber from the logging config
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "hearth={},tower_http=info",
            config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
