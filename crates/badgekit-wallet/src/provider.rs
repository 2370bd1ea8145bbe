//! Wallet providers and the uniform calling convention wrapped around them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::BridgeError;

/// Methods of the wallet wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletMethod {
    RequestAccounts,
    Accounts,
    StorePrivateCredential,
    RequestPresentation,
}

impl WalletMethod {
    pub const ALL: [WalletMethod; 4] = [
        WalletMethod::RequestAccounts,
        WalletMethod::Accounts,
        WalletMethod::StorePrivateCredential,
        WalletMethod::RequestPresentation,
    ];

    /// Name used with a generic `request({method, params})` provider.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::RequestAccounts => "mina_requestAccounts",
            Self::Accounts => "mina_accounts",
            Self::StorePrivateCredential => "mina_storePrivateCredential",
            Self::RequestPresentation => "mina_requestPresentation",
        }
    }

    /// Function name on a per-method provider.
    pub fn direct_name(&self) -> &'static str {
        match self {
            Self::RequestAccounts => "requestAccounts",
            Self::Accounts => "accounts",
            Self::StorePrivateCredential => "storePrivateCredential",
            Self::RequestPresentation => "requestPresentation",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.wire_name() == name)
    }
}

/// A generic provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCall {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl ProviderCall {
    pub fn new(method: WalletMethod, params: Vec<Value>) -> Self {
        Self {
            method: method.wire_name().to_string(),
            params,
        }
    }
}

/// Display metadata for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub slug: String,
}

/// A provider exposing a single generic `request` entry point.
#[async_trait]
pub trait RequestProvider: Send + Sync {
    async fn request(&self, call: ProviderCall) -> Result<Value, BridgeError>;

    fn name(&self) -> Option<String> {
        None
    }

    /// Self-reported wallet type, if any.
    fn wallet_type(&self) -> Option<String> {
        None
    }
}

/// A provider exposing one function per method.
#[async_trait]
pub trait DirectProvider: Send + Sync {
    /// Whether a function called `method` exists.
    fn supports(&self, method: &str) -> bool;

    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError>;

    fn name(&self) -> Option<String> {
        None
    }

    fn wallet_type(&self) -> Option<String> {
        None
    }
}

/// Either provider flavor.
#[derive(Clone)]
pub enum ProviderHandle {
    Generic(Arc<dyn RequestProvider>),
    Direct(Arc<dyn DirectProvider>),
}

impl ProviderHandle {
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Generic(p) => p.name(),
            Self::Direct(p) => p.name(),
        }
    }

    pub fn wallet_type(&self) -> Option<String> {
        match self {
            Self::Generic(p) => p.wallet_type(),
            Self::Direct(p) => p.wallet_type(),
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic(_) => write!(f, "ProviderHandle::Generic"),
            Self::Direct(_) => write!(f, "ProviderHandle::Direct"),
        }
    }
}

/// A provider offered for registration, with optional metadata.
#[derive(Debug, Clone)]
pub struct ProviderCandidate {
    pub handle: ProviderHandle,
    pub info: Option<ProviderInfo>,
    pub slug: Option<String>,
}

impl ProviderCandidate {
    pub fn new(handle: ProviderHandle) -> Self {
        Self {
            handle,
            info: None,
            slug: None,
        }
    }

    pub fn with_info(mut self, info: ProviderInfo) -> Self {
        self.info = Some(info);
        self
    }
}

/// A registered provider behind the generic calling convention.
#[derive(Clone)]
pub struct ProviderAdapter {
    info: ProviderInfo,
    handle: ProviderHandle,
}

impl ProviderAdapter {
    /// Wrap an announced candidate. Missing metadata defaults to the
    /// provider's own name (or "Mina Wallet") with slug "wallet".
    pub fn wrap(candidate: ProviderCandidate) -> Self {
        let info = candidate.info.unwrap_or_else(|| ProviderInfo {
            name: candidate
                .handle
                .name()
                .unwrap_or_else(|| "Mina Wallet".to_string()),
            slug: candidate.slug.unwrap_or_else(|| "wallet".to_string()),
        });
        Self {
            info,
            handle: candidate.handle,
        }
    }

    /// Wrap a provider found in the injection slot.
    pub fn injected(handle: ProviderHandle) -> Self {
        let info = match handle.wallet_type() {
            Some(kind) => ProviderInfo {
                name: kind.clone(),
                slug: kind,
            },
            None => ProviderInfo {
                name: "Injected Mina Wallet".to_string(),
                slug: "inject".to_string(),
            },
        };
        Self { info, handle }
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    /// Issue `call`, passing it through to a generic provider or mapping it
    /// onto the matching function of a per-method provider.
    pub async fn request(&self, call: ProviderCall) -> Result<Value, BridgeError> {
        match &self.handle {
            ProviderHandle::Generic(provider) => provider.request(call).await,
            ProviderHandle::Direct(provider) => {
                let function = WalletMethod::from_wire(&call.method)
                    .map(|m| m.direct_name())
                    .filter(|name| provider.supports(name))
                    .ok_or_else(|| BridgeError::MissingMethod(call.method.clone()))?;
                provider.invoke(function, call.params).await
            }
        }
    }
}

impl fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("info", &self.info)
            .field("handle", &self.handle)
            .finish()
    }
}
