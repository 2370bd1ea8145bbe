//! `badgekit verify`: run the full badge verification flow.

use clap::Args;
use std::sync::Arc;
use std::time::Duration;

use badgekit_attest::LocalAttestationEngine;
use badgekit_wallet::{BridgeConfig, DiscoveryOutcome, ProviderHub, SimulatedSigner, WalletBridge};

use crate::client::BadgeClient;
use crate::flow::{verify_badge, Stage};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Badge id, e.g. `age-18`.
    pub badge: String,

    /// Verifier origin the presentation is bound to.
    #[arg(short, long, default_value = super::DEFAULT_ORIGIN)]
    pub origin: String,

    /// API endpoint of the badge server.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// How long to wait for a wallet provider announcement (ms).
    #[arg(long, default_value_t = 1000)]
    pub announce_timeout_ms: u64,

    /// Upper bound on a single wallet call (ms).
    #[arg(long)]
    pub call_timeout_ms: Option<u64>,
}

pub async fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let signer = SimulatedSigner::demo(Arc::new(LocalAttestationEngine::default()))?;
    let bridge = WalletBridge::new(
        Arc::new(ProviderHub::new()),
        Arc::new(signer),
        BridgeConfig {
            announce_timeout: Duration::from_millis(args.announce_timeout_ms),
            call_timeout: args.call_timeout_ms.map(Duration::from_millis),
        },
    );

    bridge.initialize().await;
    match bridge.discover().await {
        DiscoveryOutcome::Found(adapter) => {
            println!("Wallet provider: {}", adapter.info().name);
        }
        DiscoveryOutcome::TimedOut => {
            println!("No wallet provider detected, using the simulated signer");
        }
    }

    let client = BadgeClient::new(&args.endpoint);
    let result = verify_badge(&client, &bridge, &args.badge, &args.origin, |update| {
        let marker = match update.stage {
            Stage::Success => "OK",
            Stage::Error => "FAIL",
            _ => "..",
        };
        println!("  [{}] {:<8} {}", marker, update.stage, update.message);
    })
    .await;

    match result {
        Ok(verification) if verification.success => {
            println!();
            println!("Badge {} verified", verification.badge_type);
            println!("  Issuer: {}", verification.issuer);
            Ok(())
        }
        Ok(_) => anyhow::bail!("badge {} not verified", args.badge),
        Err(e) => anyhow::bail!("badge {} not verified: {}", args.badge, e),
    }
}
