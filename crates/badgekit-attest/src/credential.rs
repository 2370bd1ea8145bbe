use badgekit_core::{Attribute, IdentityAttributes};
use badgekit_crypto::{hash_domain, merkle_root, sign, verify, Hash, KeyPair, PublicKey, Signature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AttestError;

/// An issuer-signed credential over a holder's identity attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCredential {
    /// `urn:uuid:` identifier.
    pub id: String,
    /// Holder key the credential is bound to.
    pub owner: PublicKey,
    pub issuer: PublicKey,
    pub issuance_date: DateTime<Utc>,
    pub attributes: IdentityAttributes,
    /// Hex Merkle root over per-attribute digests.
    pub commitment: String,
    pub signature: Signature,
}

impl IdentityCredential {
    /// Validate `attributes` and sign them for `owner`.
    pub fn issue(
        issuer: &KeyPair,
        owner: PublicKey,
        attributes: IdentityAttributes,
    ) -> Result<Self, AttestError> {
        attributes.validate()?;

        let id = format!("urn:uuid:{}", Uuid::now_v7());
        let issuance_date = Utc::now();
        let commitment = hex::encode(commit(&attributes));
        let issuer_key = issuer.public_key();
        let payload =
            signing_payload(&id, &owner, &issuer_key, &issuance_date, &commitment);

        let credential = Self {
            signature: sign(&payload, issuer),
            id,
            owner,
            issuer: issuer_key,
            issuance_date,
            attributes,
            commitment,
        };

        tracing::debug!(
            credential_id = %credential.id,
            issuer = %credential.issuer_identity(),
            "identity credential issued"
        );

        Ok(credential)
    }

    /// Check the attribute commitment and the issuer signature.
    pub fn verify(&self) -> Result<(), AttestError> {
        if hex::encode(commit(&self.attributes)) != self.commitment {
            return Err(AttestError::InvalidCredential(
                "attributes do not match commitment".into(),
            ));
        }
        let payload = signing_payload(
            &self.id,
            &self.owner,
            &self.issuer,
            &self.issuance_date,
            &self.commitment,
        );
        verify(&payload, &self.signature, &self.issuer)
            .map_err(|_| AttestError::InvalidCredential("issuer signature invalid".into()))
    }

    /// Base58 identity of the issuing key.
    pub fn issuer_identity(&self) -> String {
        self.issuer.fingerprint()
    }
}

/// Merkle root over domain-separated `(name, value)` digests in schema order.
pub fn commit(attributes: &IdentityAttributes) -> Hash {
    let leaves: Vec<Hash> = Attribute::ALL
        .iter()
        .map(|attribute| {
            hash_domain(
                "badgekit:attribute",
                &[
                    attribute.as_str().as_bytes(),
                    &attributes.value(*attribute).to_bytes(),
                ],
            )
        })
        .collect();
    merkle_root(&leaves)
}

fn signing_payload(
    id: &str,
    owner: &PublicKey,
    issuer: &PublicKey,
    issuance_date: &DateTime<Utc>,
    commitment: &str,
) -> Vec<u8> {
    hash_domain(
        "badgekit:credential",
        &[
            id.as_bytes(),
            &owner.to_bytes(),
            &issuer.to_bytes(),
            &issuance_date.timestamp_millis().to_le_bytes(),
            commitment.as_bytes(),
        ],
    )
    .to_vec()
}
