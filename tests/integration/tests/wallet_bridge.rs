//! Integration test: presentations produced through the wallet bridge.
//!
//! Covers the simulated-signer fallback after a discovery timeout and a
//! real provider that answers with its own credential.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use badgekit_attest::{AttestationEngine, LocalAttestationEngine};
use badgekit_core::{BadgeCatalog, IdentityAttributes, DEMO_ISSUER_SECRET};
use badgekit_crypto::KeyPair;
use badgekit_verifier::{
    CompilerConfig, LifecycleConfig, PresentationSubmission, RequestLifecycle, RuleCompiler,
    VerifierError,
};
use badgekit_wallet::{
    BridgeConfig, BridgeError, DirectProvider, DiscoveryOutcome, ProviderCandidate,
    ProviderHandle, ProviderHub, ProviderInfo, SimulatedSigner, WalletBridge, WalletMode,
};
use serde_json::{json, Value};

const ORIGIN: &str = "http://localhost:5173";

fn engine() -> Arc<dyn AttestationEngine> {
    Arc::new(LocalAttestationEngine::default())
}

fn lifecycle() -> RequestLifecycle {
    let engine = engine();
    let compiler = Arc::new(RuleCompiler::new(engine.clone(), CompilerConfig::default()));
    RequestLifecycle::new(
        Arc::new(BadgeCatalog::demo()),
        compiler,
        engine,
        LifecycleConfig::default(),
    )
}

fn bridge(hub: Arc<ProviderHub>) -> WalletBridge {
    WalletBridge::new(
        hub,
        Arc::new(SimulatedSigner::demo(engine()).unwrap()),
        BridgeConfig {
            announce_timeout: Duration::from_millis(20),
            call_timeout: Some(Duration::from_secs(5)),
        },
    )
}

async fn present_and_verify(
    lifecycle: &RequestLifecycle,
    bridge: &WalletBridge,
    badge: &str,
) -> Result<String, VerifierError> {
    let issued = lifecycle.issue(badge, Some(ORIGIN)).unwrap();
    let presentation_json = bridge
        .create_presentation(&issued.request_json, ORIGIN)
        .await
        .expect("bridge should produce a presentation");
    lifecycle
        .verify(&PresentationSubmission {
            request_id: issued.request_id,
            badge_id: Some(badge.into()),
            presentation_json,
            origin: Some(ORIGIN.into()),
        })
        .map(|outcome| outcome.issuer)
}

/// Per-method wallet holding its own credential, signed by the demo issuer.
struct HolderWallet {
    signer: SimulatedSigner,
    stored: Mutex<Vec<Value>>,
}

impl HolderWallet {
    fn new(attributes: IdentityAttributes) -> Self {
        let signer = SimulatedSigner::new(
            engine(),
            KeyPair::from_secret("wallet holder"),
            &KeyPair::from_secret(DEMO_ISSUER_SECRET),
            attributes,
        )
        .unwrap();
        Self {
            signer,
            stored: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DirectProvider for HolderWallet {
    fn supports(&self, method: &str) -> bool {
        matches!(
            method,
            "requestAccounts" | "accounts" | "storePrivateCredential" | "requestPresentation"
        )
    }

    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError> {
        match method {
            "requestAccounts" | "accounts" => Ok(json!(["B62qholder"])),
            "storePrivateCredential" => {
                self.stored.lock().unwrap().extend(params);
                Ok(json!({ "result": { "stored": true } }))
            }
            "requestPresentation" => {
                let request = params
                    .first()
                    .and_then(|p| p.get("presentationRequest"))
                    .ok_or_else(|| BridgeError::InvalidRequest("no presentation request".into()))?;
                let presentation = self
                    .signer
                    .create_presentation_json(&request.to_string(), ORIGIN)?;
                Ok(json!({ "result": { "presentationJson": presentation } }))
            }
            other => Err(BridgeError::MissingMethod(other.into())),
        }
    }
}

fn announce(hub: &ProviderHub, wallet: Arc<HolderWallet>) {
    hub.announce(
        ProviderCandidate::new(ProviderHandle::Direct(wallet)).with_info(ProviderInfo {
            name: "Holder Wallet".into(),
            slug: "holder".into(),
        }),
    );
}

#[tokio::test]
async fn test_discovery_timeout_falls_back_to_simulated_signer() {
    let bridge = bridge(Arc::new(ProviderHub::new()));
    bridge.initialize().await;

    let outcome = bridge.discover().await;
    assert!(matches!(outcome, DiscoveryOutcome::TimedOut));
    assert_eq!(bridge.snapshot().mode, WalletMode::Mock);
    assert!(!bridge.has_provider());

    let lifecycle = lifecycle();
    let issuer = present_and_verify(&lifecycle, &bridge, "age-18").await.unwrap();
    assert_eq!(issuer, CompilerConfig::default().trusted_issuer);
}

#[tokio::test]
async fn test_connect_without_wallet_reports_not_detected() {
    let bridge = bridge(Arc::new(ProviderHub::new()));
    let err = bridge.connect_wallet().await.unwrap_err();
    assert!(matches!(err, BridgeError::ProviderNotDetected));
    assert_eq!(err.to_string(), "Mina wallet provider not detected");
}

#[tokio::test]
async fn test_announced_wallet_signs_presentations() {
    let hub = Arc::new(ProviderHub::new());
    let mut us = IdentityAttributes::demo();
    us.nationality = "US".into();
    let wallet = Arc::new(HolderWallet::new(us));
    announce(&hub, wallet.clone());

    let bridge = bridge(hub);
    bridge.initialize().await;
    let snapshot = bridge.snapshot();
    assert_eq!(snapshot.mode, WalletMode::Wallet);
    assert_eq!(snapshot.accounts, vec!["B62qholder".to_string()]);
    assert_eq!(snapshot.provider_info.unwrap().slug, "holder");

    let lifecycle = lifecycle();
    // The wallet's own identity answers: adult, but a US national.
    assert!(present_and_verify(&lifecycle, &bridge, "age-18").await.is_ok());
    assert!(present_and_verify(&lifecycle, &bridge, "non-us").await.is_err());

    // Back on the simulated signer the demo identity passes.
    bridge.use_mock_wallet();
    assert!(!bridge.using_wallet());
    assert!(present_and_verify(&lifecycle, &bridge, "non-us").await.is_ok());
}

#[tokio::test]
async fn test_install_sample_credential_reaches_wallet() {
    let hub = Arc::new(ProviderHub::new());
    let wallet = Arc::new(HolderWallet::new(IdentityAttributes::demo()));
    announce(&hub, wallet.clone());

    let bridge = bridge(hub);
    assert!(matches!(bridge.discover().await, DiscoveryOutcome::Found(_)));
    let reply = bridge.install_sample_credential().await.unwrap();
    assert_eq!(reply, json!({ "stored": true }));

    let stored = wallet.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    let demo_issuer = KeyPair::from_secret(DEMO_ISSUER_SECRET).public_key();
    assert_eq!(stored[0]["issuer"], json!(demo_issuer.to_base58()));
}
