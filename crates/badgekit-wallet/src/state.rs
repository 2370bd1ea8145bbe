use serde::{Deserialize, Serialize};

use crate::provider::{ProviderAdapter, ProviderInfo};

/// Which signer presentations come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletMode {
    /// The in-process simulated signer.
    #[default]
    Mock,
    /// A connected external provider.
    Wallet,
}

/// Bridge state. Mutated only by [`WalletBridge`](crate::WalletBridge).
#[derive(Debug, Default)]
pub struct ProviderState {
    pub provider: Option<ProviderAdapter>,
    pub provider_info: Option<ProviderInfo>,
    pub available: bool,
    pub connected: bool,
    pub mode: WalletMode,
    pub accounts: Vec<String>,
    pub last_error: Option<String>,
}

impl ProviderState {
    /// Wallet mode, connected, with a provider registered.
    pub fn using_wallet(&self) -> bool {
        self.mode == WalletMode::Wallet && self.connected && self.provider.is_some()
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            provider_info: self.provider_info.clone(),
            available: self.available,
            connected: self.connected,
            mode: self.mode,
            accounts: self.accounts.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only view handed to callers and subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    pub provider_info: Option<ProviderInfo>,
    pub available: bool,
    pub connected: bool,
    pub mode: WalletMode,
    pub accounts: Vec<String>,
    pub last_error: Option<String>,
}
