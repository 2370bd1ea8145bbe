use std::time::Duration;

use badgekit_crypto::{sign, verify, KeyPair};
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, ConstraintSpec, EvalContext, Operand};
use crate::credential::IdentityCredential;
use crate::error::AttestError;
use crate::presentation::Presentation;
use crate::request::{CompiledSpec, InputContext, PresentationRequest, RequestClaims, HTTPS_REQUEST};

/// What a successful verification reveals about the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerOutput {
    /// Base58 identity of the credential issuer.
    pub issuer: String,
}

/// Verification-time context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyContext {
    /// Identity (origin) of the verifying party.
    pub verifier_identity: String,
}

/// Inputs for producing a presentation.
#[derive(Debug, Clone, Copy)]
pub struct PresentationInput<'a> {
    pub request: &'a PresentationRequest,
    pub credentials: &'a [IdentityCredential],
    /// Verifier the presentation is addressed to.
    pub verifier_identity: &'a str,
}

/// The attestation capability: compile specifications, issue nonced
/// requests, produce and verify presentations.
pub trait AttestationEngine: Send + Sync {
    /// Compile a constraint specification into engine-ready form.
    fn precompile(&self, spec: ConstraintSpec) -> Result<CompiledSpec, AttestError>;

    /// Issue a request bound to `spec`, `claims` and `action`.
    fn issue_request(
        &self,
        spec: &CompiledSpec,
        claims: RequestClaims,
        action: &str,
    ) -> Result<PresentationRequest, AttestError>;

    /// Verify `presentation` against `request`. Errors on any failure.
    fn verify(
        &self,
        request: &PresentationRequest,
        presentation: &Presentation,
        context: &VerifyContext,
    ) -> Result<IssuerOutput, AttestError>;

    /// Produce a presentation with the holder's key.
    fn create_presentation(
        &self,
        owner: &KeyPair,
        input: PresentationInput<'_>,
    ) -> Result<Presentation, AttestError>;
}

/// Configuration for [`LocalAttestationEngine`].
#[derive(Debug, Clone)]
pub struct LocalEngineConfig {
    /// Maximum request age at verification time.
    pub request_validity: Duration,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            request_validity: Duration::from_secs(5 * 60),
        }
    }
}

/// In-process engine with transparent (attribute-disclosing) presentations.
///
/// Requests and credentials are bound with Ed25519 signatures and BLAKE3
/// digests. Assertions are evaluated directly on the disclosed attributes.
#[derive(Debug, Clone, Default)]
pub struct LocalAttestationEngine {
    config: LocalEngineConfig,
}

impl LocalAttestationEngine {
    pub fn new(config: LocalEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocalEngineConfig {
        &self.config
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn pins_issuer(assertion: &Constraint) -> bool {
    match assertion {
        Constraint::Equals { left, right } => matches!(
            (left, right),
            (Operand::Issuer, Operand::Constant { .. }) | (Operand::Constant { .. }, Operand::Issuer)
        ),
        _ => false,
    }
}

impl AttestationEngine for LocalAttestationEngine {
    fn precompile(&self, spec: ConstraintSpec) -> Result<CompiledSpec, AttestError> {
        let first = spec
            .assertions
            .first()
            .ok_or_else(|| AttestError::InvalidSpec("no assertions".into()))?;
        if !pins_issuer(first) {
            return Err(AttestError::InvalidSpec(
                "first assertion must pin the credential issuer".into(),
            ));
        }
        for assertion in &spec.assertions {
            assertion.type_check()?;
        }

        let fingerprint = hex::encode(spec.digest()?);
        tracing::debug!(
            fingerprint = %fingerprint,
            assertions = spec.assertions.len(),
            "constraint specification compiled"
        );
        Ok(CompiledSpec { fingerprint, spec })
    }

    fn issue_request(
        &self,
        spec: &CompiledSpec,
        claims: RequestClaims,
        action: &str,
    ) -> Result<PresentationRequest, AttestError> {
        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);

        Ok(PresentationRequest {
            kind: HTTPS_REQUEST.into(),
            spec: spec.clone(),
            claims,
            input_context: Some(InputContext {
                action: action.to_string(),
                server_nonce: hex::encode(nonce),
            }),
        })
    }

    fn verify(
        &self,
        request: &PresentationRequest,
        presentation: &Presentation,
        context: &VerifyContext,
    ) -> Result<IssuerOutput, AttestError> {
        let digest = hex::encode(request.digest()?);
        if presentation.request_digest != digest {
            return Err(AttestError::RequestBinding(
                "request digest mismatch".into(),
            ));
        }
        if presentation.verifier_identity != context.verifier_identity {
            return Err(AttestError::VerifierMismatch {
                expected: context.verifier_identity.clone(),
                actual: presentation.verifier_identity.clone(),
            });
        }

        let validity_ms = u64::try_from(self.config.request_validity.as_millis()).unwrap_or(u64::MAX);
        let age_ms = now_millis().saturating_sub(request.claims.created_at);
        if age_ms > validity_ms {
            return Err(AttestError::RequestExpired { age_ms, validity_ms });
        }

        let credential = &presentation.credential;
        credential.verify()?;
        let payload = Presentation::signing_payload(
            &presentation.request_digest,
            &presentation.verifier_identity,
            credential,
        );
        verify(&payload, &presentation.owner_signature, &credential.owner)?;

        let issuer = credential.issuer_identity();
        let ctx = EvalContext {
            attributes: &credential.attributes,
            issuer: &issuer,
            claimed_timestamp: request.claims.created_at,
        };
        if let Some(index) = request.spec.spec.first_failure(&ctx)? {
            return Err(AttestError::ConstraintFailed {
                index,
                constraint: request.spec.spec.assertions[index].to_string(),
            });
        }

        Ok(IssuerOutput { issuer })
    }

    fn create_presentation(
        &self,
        owner: &KeyPair,
        input: PresentationInput<'_>,
    ) -> Result<Presentation, AttestError> {
        let owner_key = owner.public_key();
        let credential = input
            .credentials
            .iter()
            .find(|c| c.owner == owner_key)
            .ok_or_else(|| {
                AttestError::InvalidCredential("no credential held by this key".into())
            })?;

        let request_digest = hex::encode(input.request.digest()?);
        let payload =
            Presentation::signing_payload(&request_digest, input.verifier_identity, credential);

        Ok(Presentation {
            owner_signature: sign(&payload, owner),
            request_digest,
            verifier_identity: input.verifier_identity.to_string(),
            credential: credential.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgekit_core::{Attribute, AttributeValue, IdentityAttributes};

    struct Fixture {
        engine: LocalAttestationEngine,
        issuer: KeyPair,
        owner: KeyPair,
        credential: IdentityCredential,
    }

    fn fixture() -> Fixture {
        let issuer = KeyPair::from_seed(&[1u8; 32]);
        let owner = KeyPair::from_seed(&[2u8; 32]);
        let credential =
            IdentityCredential::issue(&issuer, owner.public_key(), IdentityAttributes::demo())
                .unwrap();
        Fixture {
            engine: LocalAttestationEngine::default(),
            issuer,
            owner,
            credential,
        }
    }

    fn spec_for(issuer: &KeyPair, extra: Vec<Constraint>) -> ConstraintSpec {
        let mut assertions = vec![Constraint::equals(
            Operand::Issuer,
            Operand::constant(AttributeValue::Text(issuer.public_key().fingerprint())),
        )];
        assertions.extend(extra);
        ConstraintSpec::new(assertions)
    }

    fn tier_at_least(min: u64) -> Constraint {
        Constraint::less_than_eq(
            Operand::constant(AttributeValue::Integer(min)),
            Operand::property(Attribute::KycTier),
        )
    }

    fn present(f: &Fixture, request: &PresentationRequest, verifier: &str) -> Presentation {
        f.engine
            .create_presentation(
                &f.owner,
                PresentationInput {
                    request,
                    credentials: std::slice::from_ref(&f.credential),
                    verifier_identity: verifier,
                },
            )
            .unwrap()
    }

    fn issue(f: &Fixture, extra: Vec<Constraint>) -> PresentationRequest {
        let compiled = f.engine.precompile(spec_for(&f.issuer, extra)).unwrap();
        f.engine
            .issue_request(
                &compiled,
                RequestClaims {
                    created_at: now_millis(),
                },
                "test:badge:kyc",
            )
            .unwrap()
    }

    fn ctx(verifier: &str) -> VerifyContext {
        VerifyContext {
            verifier_identity: verifier.into(),
        }
    }

    #[test]
    fn test_precompile_requires_issuer_pin() {
        let engine = LocalAttestationEngine::default();
        assert!(engine.precompile(ConstraintSpec::new(vec![])).is_err());
        assert!(matches!(
            engine.precompile(ConstraintSpec::new(vec![tier_at_least(1)])),
            Err(AttestError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_precompile_is_deterministic() {
        let f = fixture();
        let a = f.engine.precompile(spec_for(&f.issuer, vec![tier_at_least(1)])).unwrap();
        let b = f.engine.precompile(spec_for(&f.issuer, vec![tier_at_least(1)])).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 64);
    }

    #[test]
    fn test_issue_request_nonces_are_unique() {
        let f = fixture();
        let a = issue(&f, vec![]);
        let b = issue(&f, vec![]);
        assert_eq!(a.nonce().unwrap().len(), 64);
        assert_ne!(a.nonce(), b.nonce());
        assert_eq!(a.action(), Some("test:badge:kyc"));
    }

    #[test]
    fn test_verify_success_returns_issuer() {
        let f = fixture();
        let request = issue(&f, vec![tier_at_least(2)]);
        let presentation = present(&f, &request, "http://localhost:5173");
        let output = f
            .engine
            .verify(&request, &presentation, &ctx("http://localhost:5173"))
            .unwrap();
        assert_eq!(output.issuer, f.issuer.public_key().fingerprint());
    }

    #[test]
    fn test_verify_unsatisfied_constraint() {
        let f = fixture();
        let request = issue(&f, vec![tier_at_least(5)]);
        let presentation = present(&f, &request, "v");
        let result = f.engine.verify(&request, &presentation, &ctx("v"));
        assert!(matches!(
            result,
            Err(AttestError::ConstraintFailed { index: 1, .. })
        ));
    }

    #[test]
    fn test_verify_wrong_issuer() {
        let f = fixture();
        let other = KeyPair::from_seed(&[9u8; 32]);
        let compiled = f.engine.precompile(spec_for(&other, vec![])).unwrap();
        let request = f
            .engine
            .issue_request(&compiled, RequestClaims { created_at: now_millis() }, "a")
            .unwrap();
        let presentation = present(&f, &request, "v");
        assert!(matches!(
            f.engine.verify(&request, &presentation, &ctx("v")),
            Err(AttestError::ConstraintFailed { index: 0, .. })
        ));
    }

    #[test]
    fn test_verify_origin_mismatch() {
        let f = fixture();
        let request = issue(&f, vec![]);
        let presentation = present(&f, &request, "https://evil.example");
        assert!(matches!(
            f.engine.verify(&request, &presentation, &ctx("https://good.example")),
            Err(AttestError::VerifierMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_other_request() {
        let f = fixture();
        let first = issue(&f, vec![]);
        let second = issue(&f, vec![]);
        let presentation = present(&f, &first, "v");
        assert!(matches!(
            f.engine.verify(&second, &presentation, &ctx("v")),
            Err(AttestError::RequestBinding(_))
        ));
    }

    #[test]
    fn test_verify_expired_request() {
        let f = fixture();
        let compiled = f.engine.precompile(spec_for(&f.issuer, vec![])).unwrap();
        let stale = now_millis() - 6 * 60 * 1000;
        let request = f
            .engine
            .issue_request(&compiled, RequestClaims { created_at: stale }, "a")
            .unwrap();
        let presentation = present(&f, &request, "v");
        assert!(matches!(
            f.engine.verify(&request, &presentation, &ctx("v")),
            Err(AttestError::RequestExpired { .. })
        ));
    }

    #[test]
    fn test_verify_forged_owner_signature() {
        let f = fixture();
        let request = issue(&f, vec![]);
        let mut presentation = present(&f, &request, "v");
        let forged = present(&f, &issue(&f, vec![]), "v");
        presentation.owner_signature = forged.owner_signature;
        assert!(matches!(
            f.engine.verify(&request, &presentation, &ctx("v")),
            Err(AttestError::Crypto(_))
        ));
    }

    #[test]
    fn test_create_presentation_requires_owned_credential() {
        let f = fixture();
        let request = issue(&f, vec![]);
        let stranger = KeyPair::generate();
        let result = f.engine.create_presentation(
            &stranger,
            PresentationInput {
                request: &request,
                credentials: std::slice::from_ref(&f.credential),
                verifier_identity: "v",
            },
        );
        assert!(matches!(result, Err(AttestError::InvalidCredential(_))));
    }

    #[test]
    fn test_presentation_json_roundtrip_verifies() {
        let f = fixture();
        let request = issue(&f, vec![tier_at_least(1)]);
        let json = present(&f, &request, "v").to_json().unwrap();
        let parsed = Presentation::from_json(&json).unwrap();
        assert!(f.engine.verify(&request, &parsed, &ctx("v")).is_ok());
    }
}
