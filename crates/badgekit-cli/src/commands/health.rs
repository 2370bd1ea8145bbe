//! `badgekit health`: check a running badge server.

use clap::Args;

use crate::client::BadgeClient;

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// API endpoint of the badge server.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &HealthArgs) -> anyhow::Result<()> {
    let client = BadgeClient::new(&args.endpoint);
    match client.health().await {
        Ok(health) => {
            println!("Server Status:");
            println!("  Status:   {}", health.status);
            println!("  Version:  {}", health.version);
            println!("  Badges:   {}", health.badges);
        }
        Err(e) => {
            println!("Could not reach badge server at {}", client.endpoint());
            println!("  Error: {}", e);
        }
    }
    Ok(())
}
