//! Provider discovery.
//!
//! A [`ProviderHub`] is the meeting point between wallets and the bridge: a
//! wallet either sits in the injection slot or answers a request signal with
//! an announcement. [`ProviderHub::discover`] resolves to a provider or to
//! [`DiscoveryOutcome::TimedOut`].

use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::provider::{ProviderAdapter, ProviderCandidate, ProviderHandle};

const SIGNAL_CAPACITY: usize = 16;

/// Result of a discovery attempt.
#[derive(Debug, Clone)]
pub enum DiscoveryOutcome {
    Found(ProviderAdapter),
    TimedOut,
}

/// Injection slot plus request/announce signalling.
pub struct ProviderHub {
    injected: RwLock<Option<ProviderHandle>>,
    last_announced: RwLock<Option<ProviderCandidate>>,
    request_tx: broadcast::Sender<()>,
    announce_tx: broadcast::Sender<ProviderCandidate>,
}

impl ProviderHub {
    pub fn new() -> Self {
        let (request_tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        let (announce_tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            injected: RwLock::new(None),
            last_announced: RwLock::new(None),
            request_tx,
            announce_tx,
        }
    }

    /// Place a provider in the injection slot.
    pub fn inject(&self, handle: ProviderHandle) {
        *self.injected.write().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// The injected provider, if any.
    pub fn injected(&self) -> Option<ProviderAdapter> {
        self.injected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(ProviderAdapter::injected)
    }

    /// Receive request-provider signals. Wallets answer with [`announce`].
    ///
    /// [`announce`]: ProviderHub::announce
    pub fn on_request(&self) -> broadcast::Receiver<()> {
        self.request_tx.subscribe()
    }

    /// Announce a provider. The latest announcement is retained for
    /// discoveries that start later.
    pub fn announce(&self, candidate: ProviderCandidate) {
        *self.last_announced.write().unwrap_or_else(PoisonError::into_inner) =
            Some(candidate.clone());
        // No listener is fine: the candidate is retained.
        let _ = self.announce_tx.send(candidate);
    }

    /// Broadcast a request-provider signal without waiting.
    pub fn request_provider(&self) {
        let listeners = self.request_tx.send(()).unwrap_or(0);
        tracing::debug!(listeners, "provider request broadcast");
    }

    /// The most recent announcement, if any.
    pub fn announced(&self) -> Option<ProviderAdapter> {
        self.last_announced
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(ProviderAdapter::wrap)
    }

    /// Find a provider: injection slot, then a retained announcement, then a
    /// request signal followed by up to `window` of listening.
    pub async fn discover(&self, window: Duration) -> DiscoveryOutcome {
        if let Some(adapter) = self.injected().or_else(|| self.announced()) {
            return DiscoveryOutcome::Found(adapter);
        }

        let mut announcements = self.announce_tx.subscribe();
        self.request_provider();

        let wait = async {
            loop {
                match announcements.recv().await {
                    Ok(candidate) => return Some(ProviderAdapter::wrap(candidate)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "announcements lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        };

        match tokio::time::timeout(window, wait).await {
            Ok(Some(adapter)) => DiscoveryOutcome::Found(adapter),
            Ok(None) | Err(_) => {
                tracing::debug!(window_ms = window.as_millis() as u64, "provider discovery timed out");
                DiscoveryOutcome::TimedOut
            }
        }
    }
}

impl Default for ProviderHub {
    fn default() -> Self {
        Self::new()
    }
}
