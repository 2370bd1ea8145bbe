//! Badge Kit CLI: request and verify eligibility badges.
//!
//! Subcommands: badges, request, verify, credential, health.

mod client;
mod commands;
mod flow;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Badge Kit: private eligibility badges.
#[derive(Parser, Debug)]
#[command(name = "badgekit", version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the badge catalog.
    Badges(commands::badges::BadgesArgs),
    /// Issue a presentation request for a badge.
    Request(commands::request::RequestArgs),
    /// Request, sign and verify a badge presentation.
    Verify(commands::verify::VerifyArgs),
    /// Print the simulated holder's credential.
    Credential(commands::credential::CredentialArgs),
    /// Check a running badge server.
    Health(commands::health::HealthArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Badges(args) => commands::badges::run(args).await,
        Commands::Request(args) => commands::request::run(args).await,
        Commands::Verify(args) => commands::verify::run(args).await,
        Commands::Credential(args) => commands::credential::run(args),
        Commands::Health(args) => commands::health::run(args).await,
    }
}
