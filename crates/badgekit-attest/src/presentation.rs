use badgekit_crypto::{hash_domain, Signature};
use serde::{Deserialize, Serialize};

use crate::credential::IdentityCredential;
use crate::error::AttestError;

/// A holder's answer to a presentation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// Hex digest of the request being answered.
    pub request_digest: String,
    /// Verifier the holder addressed the presentation to.
    pub verifier_identity: String,
    pub credential: IdentityCredential,
    /// Owner signature over [`Presentation::signing_payload`].
    pub owner_signature: Signature,
}

impl Presentation {
    /// Bytes the owner signs: request digest, verifier identity and
    /// credential commitment.
    pub fn signing_payload(
        request_digest: &str,
        verifier_identity: &str,
        credential: &IdentityCredential,
    ) -> Vec<u8> {
        hash_domain(
            "badgekit:presentation",
            &[
                request_digest.as_bytes(),
                verifier_identity.as_bytes(),
                credential.id.as_bytes(),
                credential.commitment.as_bytes(),
            ],
        )
        .to_vec()
    }

    pub fn to_json(&self) -> Result<String, AttestError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AttestError> {
        Ok(serde_json::from_str(json)?)
    }
}
