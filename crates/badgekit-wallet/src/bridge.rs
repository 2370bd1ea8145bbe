use dashmap::DashMap;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use crate::discovery::{DiscoveryOutcome, ProviderHub};
use crate::error::BridgeError;
use crate::provider::{ProviderAdapter, ProviderCall, ProviderCandidate, WalletMethod};
use crate::response::{decode_accounts, normalize, PresentationReply};
use crate::simulated::SimulatedSigner;
use crate::state::{ProviderSnapshot, ProviderState, WalletMode};

/// Wallet bridge settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long discovery listens for announcements.
    pub announce_timeout: Duration,
    /// Upper bound on a single provider call. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            announce_timeout: Duration::from_secs(1),
            call_timeout: None,
        }
    }
}

type Subscriber = Arc<dyn Fn(&ProviderSnapshot) + Send + Sync>;

/// Call one subscriber. A panic is logged and does not reach the caller.
fn notify(subscriber: &Subscriber, snapshot: &ProviderSnapshot) {
    if panic::catch_unwind(AssertUnwindSafe(|| subscriber(snapshot))).is_err() {
        tracing::warn!("wallet state subscriber panicked");
    }
}

/// Handle returned by [`WalletBridge::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Client-side bridge to a wallet provider, falling back to a simulated
/// signer while no wallet is connected.
pub struct WalletBridge {
    hub: Arc<ProviderHub>,
    signer: Arc<SimulatedSigner>,
    config: BridgeConfig,
    state: RwLock<ProviderState>,
    subscribers: DashMap<u64, Subscriber>,
    next_subscriber: AtomicU64,
}

impl WalletBridge {
    pub fn new(hub: Arc<ProviderHub>, signer: Arc<SimulatedSigner>, config: BridgeConfig) -> Self {
        Self {
            hub,
            signer,
            config,
            state: RwLock::new(ProviderState::default()),
            subscribers: DashMap::new(),
            next_subscriber: AtomicU64::new(0),
        }
    }

    /// Register an injected or previously announced provider if there is
    /// one, then signal that a provider is wanted. Does not wait.
    pub async fn initialize(&self) {
        if let Some(adapter) = self.hub.injected().or_else(|| self.hub.announced()) {
            self.register_adapter(adapter).await;
            return;
        }
        self.hub.request_provider();
    }

    /// Run discovery with the configured window, registering what it finds.
    pub async fn discover(&self) -> DiscoveryOutcome {
        let outcome = self.hub.discover(self.config.announce_timeout).await;
        if let DiscoveryOutcome::Found(adapter) = &outcome {
            self.register_adapter(adapter.clone()).await;
        }
        outcome
    }

    /// Wrap and register `candidate`, then probe it for accounts.
    pub async fn register_provider(&self, candidate: ProviderCandidate) {
        self.register_adapter(ProviderAdapter::wrap(candidate)).await;
    }

    async fn register_adapter(&self, adapter: ProviderAdapter) {
        tracing::info!(
            provider = %adapter.info().name,
            slug = %adapter.info().slug,
            "wallet provider registered"
        );
        self.mutate(|state| {
            state.provider_info = Some(adapter.info().clone());
            state.provider = Some(adapter.clone());
            state.available = true;
        });
        self.refresh_accounts(&adapter).await;
    }

    /// Best-effort account listing. Providers without it are left as is.
    async fn refresh_accounts(&self, adapter: &ProviderAdapter) {
        let reply = self
            .timed_request(adapter, WalletMethod::Accounts, vec![])
            .await
            .and_then(normalize);
        match reply {
            Ok(value) => {
                let accounts = decode_accounts(value);
                if !accounts.is_empty() {
                    self.mutate(|state| {
                        state.accounts = accounts;
                        state.connected = true;
                        state.mode = WalletMode::Wallet;
                    });
                }
            }
            Err(e) => tracing::debug!(error = %e, "account probe failed"),
        }
    }

    async fn ensure_provider(&self) -> Result<ProviderAdapter, BridgeError> {
        if let Some(adapter) = self.read().provider.clone() {
            return Ok(adapter);
        }
        match self.discover().await {
            DiscoveryOutcome::Found(adapter) => Ok(adapter),
            DiscoveryOutcome::TimedOut => Err(BridgeError::ProviderNotDetected),
        }
    }

    /// Ask the provider for account authorization. A non-empty reply
    /// switches to wallet mode; an empty one falls back to mock.
    pub async fn connect_wallet(&self) -> Result<Vec<String>, BridgeError> {
        let adapter = self.ensure_provider().await?;
        let reply = self
            .call_provider(&adapter, WalletMethod::RequestAccounts, vec![])
            .await?;
        let accounts = decode_accounts(reply);
        let connected = !accounts.is_empty();
        self.mutate(|state| {
            state.connected = connected;
            state.accounts = accounts.clone();
            state.mode = if connected {
                WalletMode::Wallet
            } else {
                WalletMode::Mock
            };
        });
        tracing::info!(connected, accounts = accounts.len(), "wallet connect finished");
        Ok(accounts)
    }

    /// Store the simulated signer's credential in the real wallet.
    pub async fn install_sample_credential(&self) -> Result<Value, BridgeError> {
        let adapter = self.ensure_provider().await?;
        let credential_json = self.signer.sample_credential_json()?;
        let payload: Value = serde_json::from_str(&credential_json)
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;
        self.call_provider(&adapter, WalletMethod::StorePrivateCredential, vec![payload])
            .await
    }

    /// Presentation JSON for `request_json`, from the connected wallet or
    /// the simulated signer.
    pub async fn create_presentation(
        &self,
        request_json: &str,
        origin: &str,
    ) -> Result<String, BridgeError> {
        if !self.using_wallet() {
            return self.signer.create_presentation_json(request_json, origin);
        }

        let adapter = self.ensure_provider().await?;
        let request: Value = serde_json::from_str(request_json)
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;
        let reply = self
            .call_provider(
                &adapter,
                WalletMethod::RequestPresentation,
                vec![json!({ "presentationRequest": request })],
            )
            .await?;
        Ok(PresentationReply::decode(reply)?.into_json())
    }

    /// Call the provider and normalize its reply. Failures are recorded in
    /// `last_error`; a success clears a previous one.
    pub async fn call_provider(
        &self,
        adapter: &ProviderAdapter,
        method: WalletMethod,
        params: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        let raw = self.timed_request(adapter, method, params).await;

        match raw.and_then(normalize) {
            Ok(value) => {
                if self.read().last_error.is_some() {
                    self.mutate(|state| state.last_error = None);
                }
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(method = method.wire_name(), error = %e, "wallet call failed");
                let message = e.to_string();
                self.mutate(|state| state.last_error = Some(message));
                Err(e)
            }
        }
    }

    async fn timed_request(
        &self,
        adapter: &ProviderAdapter,
        method: WalletMethod,
        params: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        let call = adapter.request(ProviderCall::new(method, params));
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(BridgeError::Timeout {
                    method: method.wire_name().to_string(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }),
            None => call.await,
        }
    }

    pub fn using_wallet(&self) -> bool {
        self.read().using_wallet()
    }

    pub fn has_provider(&self) -> bool {
        self.read().available
    }

    /// Switch back to the simulated signer. The provider stays registered.
    pub fn use_mock_wallet(&self) {
        self.mutate(|state| state.mode = WalletMode::Mock);
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        self.read().snapshot()
    }

    /// Register `callback`; it is called at once and after every change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProviderSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let callback: Subscriber = Arc::new(callback);
        self.subscribers.insert(id, Arc::clone(&callback));
        notify(&callback, &self.snapshot());
        SubscriptionId(id)
    }

    /// Remove a subscriber. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id.0).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change`, then notify subscribers outside the lock.
    fn mutate(&self, change: impl FnOnce(&mut ProviderState)) {
        let snapshot = {
            let mut state = self.write();
            change(&mut state);
            state.snapshot()
        };
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for subscriber in subscribers {
            notify(&subscriber, &snapshot);
        }
    }
}
