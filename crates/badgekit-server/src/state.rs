//! Shared state behind the HTTP handlers.

use std::sync::Arc;
use std::time::Duration;

use badgekit_attest::{AttestationEngine, LocalAttestationEngine, LocalEngineConfig};
use badgekit_core::BadgeCatalog;
use badgekit_crypto::KeyPair;
use badgekit_verifier::{CompilerConfig, RequestLifecycle, RuleCompiler};

use crate::config::ServerConfig;

pub struct AppState {
    pub lifecycle: Arc<RequestLifecycle>,
    pub compiler: Arc<RuleCompiler>,
    /// Identity of the trusted issuer.
    pub issuer: String,
}

impl AppState {
    /// Build the catalog, engine, compiler and lifecycle from configuration.
    /// Every badge is compiled up front so a broken rule stops startup.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let catalog = match &config.catalog.path {
            Some(path) => {
                let catalog = BadgeCatalog::load(path)?;
                tracing::info!(path = %path.display(), badges = catalog.len(), "loaded badge catalog");
                catalog
            }
            None => BadgeCatalog::demo(),
        };

        let lifecycle_config = config.requests.lifecycle()?;
        let engine: Arc<dyn AttestationEngine> =
            Arc::new(LocalAttestationEngine::new(LocalEngineConfig {
                request_validity: Duration::from_secs(config.requests.ttl_secs),
            }));

        let issuer_key = KeyPair::from_secret(&config.issuer.secret).public_key();
        let compiler_config = CompilerConfig::for_issuer(&issuer_key);
        let issuer = compiler_config.trusted_issuer.clone();
        let compiler = Arc::new(RuleCompiler::new(engine.clone(), compiler_config));

        for badge in catalog.badges() {
            compiler.compile(&badge.id, &badge.rules)?;
        }

        let lifecycle = Arc::new(RequestLifecycle::new(
            Arc::new(catalog),
            compiler.clone(),
            engine,
            lifecycle_config,
        ));

        Ok(Self {
            lifecycle,
            compiler,
            issuer,
        })
    }
}
