//! `badgekit badges`: list the badge catalog.

use clap::Args;

use crate::client::{BadgeBackend, BadgeClient};

#[derive(Args, Debug)]
pub struct BadgesArgs {
    /// API endpoint of the badge server.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Print the raw JSON reply.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &BadgesArgs) -> anyhow::Result<()> {
    let client = BadgeClient::new(&args.endpoint);
    let badges = match client.list_badges().await {
        Ok(badges) => badges,
        Err(e) => {
            println!("Could not reach badge server at {}", client.endpoint());
            println!("  Error: {}", e);
            println!();
            println!("Is the server running? Start it with: badgekit-server");
            return Ok(());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&badges)?);
        return Ok(());
    }

    println!("Badges ({}):", badges.len());
    for badge in &badges {
        println!("  {:<18} {:<22} {}", badge.id, badge.label, badge.description);
    }
    Ok(())
}
