//! Badge Kit verifier server: entry point.
//!
//! Serves the badge catalog and the presentation request API with
//! configuration from a TOML file or defaults.

mod api;
mod config;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::{ServerConfig, ISSUER_SECRET_ENV};
use state::AppState;

/// Badge Kit verifier server
#[derive(Parser, Debug)]
#[command(name = "badgekit-server", version, about = "Badge Kit verifier server")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "badgekit.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the badge catalog file (JSON or TOML).
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(&args.log_level, "text");
        let config = ServerConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = ServerConfig::load(&args.config)?;

    // Apply CLI and environment overrides
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(ref catalog) = args.catalog {
        config.catalog.path = Some(catalog.clone());
    }
    config.logging.level = args.log_level;
    config.apply_issuer_override(std::env::var(ISSUER_SECRET_ENV).ok());

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Badge Kit server v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::from_config(&config)?);
    tracing::info!(
        issuer = %state.issuer,
        compiled = state.compiler.cache_len(),
        "badge specifications ready"
    );
    let listen_addr: SocketAddr = config.api_addr().parse()?;

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = api::start_api_server(listen_addr, state) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server error");
                return Err(e);
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    tracing::info!("Badge Kit server exited cleanly");
    Ok(())
}
