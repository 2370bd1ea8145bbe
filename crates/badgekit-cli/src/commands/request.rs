//! `badgekit request`: issue a presentation request for a badge.

use clap::Args;

use crate::client::{BadgeBackend, BadgeClient};

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Badge id, e.g. `age-18`.
    pub badge: String,

    /// Verifier origin the presentation will be bound to.
    #[arg(short, long, default_value = super::DEFAULT_ORIGIN)]
    pub origin: String,

    /// API endpoint of the badge server.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &RequestArgs) -> anyhow::Result<()> {
    let client = BadgeClient::new(&args.endpoint);
    let reply = client
        .request_presentation(&args.badge, &args.origin)
        .await
        .map_err(|e| anyhow::anyhow!("presentation request failed: {}", e))?;

    println!("Presentation request issued:");
    println!("  Badge:       {}", reply.badge_type);
    println!("  Request ID:  {}", reply.request_id);
    println!("  Expires at:  {} (unix ms)", reply.expires_at);
    println!();
    println!("{}", reply.request_json);
    Ok(())
}
