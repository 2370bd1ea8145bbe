use std::sync::Arc;

use badgekit_attest::{
    AttestationEngine, IdentityCredential, PresentationInput, PresentationRequest,
};
use badgekit_core::{IdentityAttributes, DEMO_ISSUER_SECRET, DEMO_OWNER_SECRET};
use badgekit_crypto::KeyPair;

use crate::error::BridgeError;

/// In-process signer holding one credential. Used whenever no wallet is
/// connected.
pub struct SimulatedSigner {
    engine: Arc<dyn AttestationEngine>,
    owner: KeyPair,
    credential: IdentityCredential,
}

impl SimulatedSigner {
    /// Issue `attributes` to `owner` under `issuer`.
    pub fn new(
        engine: Arc<dyn AttestationEngine>,
        owner: KeyPair,
        issuer: &KeyPair,
        attributes: IdentityAttributes,
    ) -> Result<Self, BridgeError> {
        let credential = IdentityCredential::issue(issuer, owner.public_key(), attributes)?;
        Ok(Self {
            engine,
            owner,
            credential,
        })
    }

    /// The demo holder with the demo identity, signed by the demo issuer.
    pub fn demo(engine: Arc<dyn AttestationEngine>) -> Result<Self, BridgeError> {
        Self::new(
            engine,
            KeyPair::from_secret(DEMO_OWNER_SECRET),
            &KeyPair::from_secret(DEMO_ISSUER_SECRET),
            IdentityAttributes::demo(),
        )
    }

    pub fn credential(&self) -> &IdentityCredential {
        &self.credential
    }

    /// Answer `request_json` for verifier `origin`.
    pub fn create_presentation_json(
        &self,
        request_json: &str,
        origin: &str,
    ) -> Result<String, BridgeError> {
        let request = PresentationRequest::from_json(request_json)
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;
        let presentation = self.engine.create_presentation(
            &self.owner,
            PresentationInput {
                request: &request,
                credentials: std::slice::from_ref(&self.credential),
                verifier_identity: origin,
            },
        )?;
        tracing::debug!(origin, "simulated presentation created");
        Ok(presentation.to_json()?)
    }

    /// The held credential as JSON, for installing into a real wallet.
    pub fn sample_credential_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(&self.credential)
            .map_err(|e| BridgeError::Signer(badgekit_attest::AttestError::from(e)))
    }
}
