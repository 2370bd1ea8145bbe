//! The client verification flow: request, wallet, verify.

use std::fmt;

use badgekit_wallet::WalletBridge;

use crate::client::{BadgeBackend, PresentationPayload, Verification};

/// Stage reported while a badge is being verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Wallet,
    Verify,
    Success,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Wallet => "wallet",
            Self::Verify => "verify",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::Request => "Building presentation request",
            Self::Wallet => "Wallet constructing proof",
            Self::Verify => "Verifier checking presentation",
            Self::Success => "Badge verified",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub stage: Stage,
    pub message: String,
}

impl StageUpdate {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            message: stage.default_message().to_string(),
        }
    }
}

/// Verify `badge_type` end to end, reporting each stage to `on_status`.
/// A failure is reported as [`Stage::Error`] and returned.
pub async fn verify_badge<F>(
    backend: &dyn BadgeBackend,
    bridge: &WalletBridge,
    badge_type: &str,
    origin: &str,
    mut on_status: F,
) -> anyhow::Result<Verification>
where
    F: FnMut(StageUpdate),
{
    let result = run_stages(backend, bridge, badge_type, origin, &mut on_status).await;
    if let Err(e) = &result {
        tracing::debug!(badge_type, error = %e, "badge verification failed");
        on_status(StageUpdate {
            stage: Stage::Error,
            message: e.to_string(),
        });
    }
    result
}

async fn run_stages<F>(
    backend: &dyn BadgeBackend,
    bridge: &WalletBridge,
    badge_type: &str,
    origin: &str,
    on_status: &mut F,
) -> anyhow::Result<Verification>
where
    F: FnMut(StageUpdate),
{
    on_status(StageUpdate::new(Stage::Request));
    let request = backend.request_presentation(badge_type, origin).await?;

    let mut wallet = StageUpdate::new(Stage::Wallet);
    if bridge.using_wallet() {
        wallet.message = "Waiting for wallet approval".into();
    }
    on_status(wallet);
    let presentation_json = bridge
        .create_presentation(&request.request_json, origin)
        .await?;

    on_status(StageUpdate::new(Stage::Verify));
    let verification = backend
        .send_presentation(&PresentationPayload {
            badge_type: badge_type.to_string(),
            request_id: request.request_id,
            presentation_json,
            origin: origin.to_string(),
        })
        .await?;

    on_status(StageUpdate::new(Stage::Success));
    Ok(verification)
}
