use badgekit_crypto::{hash_domain, Hash};
use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintSpec;
use crate::error::AttestError;

/// Request kind for presentations answered over HTTPS.
pub const HTTPS_REQUEST: &str = "https";

/// An engine-ready constraint specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSpec {
    /// Hex digest of `spec`.
    pub fingerprint: String,
    pub spec: ConstraintSpec,
}

/// Public claims bound into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestClaims {
    /// Claimed timestamp in Unix milliseconds.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputContext {
    /// Action tag the presentation is scoped to.
    pub action: String,
    /// Server nonce; doubles as the request identifier.
    pub server_nonce: String,
}

/// A nonce-bound challenge the holder answers with a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub spec: CompiledSpec,
    pub claims: RequestClaims,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_context: Option<InputContext>,
}

impl PresentationRequest {
    pub fn nonce(&self) -> Option<&str> {
        self.input_context.as_ref().map(|c| c.server_nonce.as_str())
    }

    pub fn action(&self) -> Option<&str> {
        self.input_context.as_ref().map(|c| c.action.as_str())
    }

    pub fn to_json(&self) -> Result<String, AttestError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AttestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Digest a presentation binds to. Covers the spec fingerprint, claims,
    /// action and nonce.
    pub fn digest(&self) -> Result<Hash, AttestError> {
        let encoded = serde_json::to_vec(self)?;
        Ok(hash_domain("badgekit:request", &[&encoded]))
    }
}
