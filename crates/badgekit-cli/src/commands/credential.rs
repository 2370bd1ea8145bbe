//! `badgekit credential`: print the simulated holder's credential.

use clap::Args;
use std::sync::Arc;

use badgekit_attest::LocalAttestationEngine;
use badgekit_wallet::SimulatedSigner;

#[derive(Args, Debug)]
pub struct CredentialArgs {
    /// Pretty-print the credential.
    #[arg(long)]
    pub pretty: bool,
}

pub fn run(args: &CredentialArgs) -> anyhow::Result<()> {
    let signer = SimulatedSigner::demo(Arc::new(LocalAttestationEngine::default()))?;
    let json = signer.sample_credential_json()?;
    if args.pretty {
        let value: serde_json::Value = serde_json::from_str(&json)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", json);
    }
    Ok(())
}
