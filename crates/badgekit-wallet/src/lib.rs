//! Badge Kit Wallet: client-side bridge to wallet providers.
//!
//! Providers are found through a [`ProviderHub`], wrapped behind one calling
//! convention and driven by a [`WalletBridge`]. Without a connected wallet the
//! bridge signs with a [`SimulatedSigner`].

pub mod bridge;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod response;
pub mod simulated;
pub mod state;

pub use bridge::{BridgeConfig, SubscriptionId, WalletBridge};
pub use discovery::{DiscoveryOutcome, ProviderHub};
pub use error::BridgeError;
pub use provider::{
    DirectProvider, ProviderAdapter, ProviderCall, ProviderCandidate, ProviderHandle,
    ProviderInfo, RequestProvider, WalletMethod,
};
pub use response::{decode_accounts, normalize, PresentationReply, ProviderReply};
pub use simulated::SimulatedSigner;
pub use state::{ProviderSnapshot, ProviderState, WalletMode};
