//! Integration test: issue, present and verify badges across crates.
//!
//! The verifier side (badgekit-verifier) issues requests from the demo
//! catalog; holders present with a simulated signer (badgekit-wallet)
//! carrying credentials from badgekit-attest.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use badgekit_attest::{
    AttestError, AttestationEngine, CompiledSpec, ConstraintSpec, IssuerOutput,
    LocalAttestationEngine, Presentation, PresentationInput, PresentationRequest, RequestClaims,
    VerifyContext,
};
use badgekit_core::{
    BadgeCatalog, IdentityAttributes, RequestState, DEMO_ISSUER_SECRET, DEMO_OWNER_SECRET,
};
use badgekit_crypto::KeyPair;
use badgekit_verifier::{
    CompilerConfig, IssuedRequest, LifecycleConfig, PresentationSubmission, RequestLifecycle,
    RuleCompiler, VerifierError,
};
use badgekit_wallet::SimulatedSigner;
use chrono::{Duration, TimeZone, Utc};

const ORIGIN: &str = "http://localhost:5173";

fn lifecycle_with(engine: Arc<dyn AttestationEngine>, config: LifecycleConfig) -> RequestLifecycle {
    let compiler = Arc::new(RuleCompiler::new(engine.clone(), CompilerConfig::default()));
    RequestLifecycle::new(Arc::new(BadgeCatalog::demo()), compiler, engine, config)
}

fn lifecycle() -> RequestLifecycle {
    lifecycle_with(
        Arc::new(LocalAttestationEngine::default()),
        LifecycleConfig::default(),
    )
}

/// A holder of `attributes`, certified by the demo issuer.
fn holder(attributes: IdentityAttributes) -> SimulatedSigner {
    holder_from(&KeyPair::from_secret(DEMO_ISSUER_SECRET), attributes)
}

fn holder_from(issuer: &KeyPair, attributes: IdentityAttributes) -> SimulatedSigner {
    SimulatedSigner::new(
        Arc::new(LocalAttestationEngine::default()),
        KeyPair::from_secret(DEMO_OWNER_SECRET),
        issuer,
        attributes,
    )
    .expect("credential issuance should succeed")
}

fn submit(
    lifecycle: &RequestLifecycle,
    issued: &IssuedRequest,
    badge: &str,
    signer: &SimulatedSigner,
) -> Result<String, VerifierError> {
    let presentation_json = signer
        .create_presentation_json(&issued.request_json, ORIGIN)
        .expect("presentation should be created");
    lifecycle
        .verify(&PresentationSubmission {
            request_id: issued.request_id.clone(),
            badge_id: Some(badge.to_string()),
            presentation_json,
            origin: Some(ORIGIN.to_string()),
        })
        .map(|outcome| outcome.issuer)
}

fn verify_badge(badge: &str, attributes: IdentityAttributes) -> Result<String, VerifierError> {
    let lifecycle = lifecycle();
    let issued = lifecycle.issue(badge, Some(ORIGIN)).expect("issue should succeed");
    submit(&lifecycle, &issued, badge, &holder(attributes))
}

fn born_years_ago(years: i64) -> u64 {
    (Utc::now() - Duration::days(365 * years + 30))
        .timestamp_millis()
        .unsigned_abs()
}

// =========================================================================
// Badge scenarios
// =========================================================================

#[test]
fn test_age_18_demo_identity() {
    let demo = IdentityAttributes::demo();
    let born = Utc.with_ymd_and_hms(2000, 6, 18, 0, 0, 0).unwrap();
    assert_eq!(demo.date_of_birth_ms, born.timestamp_millis() as u64);

    let issuer = verify_badge("age-18", demo).expect("adult demo identity should verify");
    assert_eq!(issuer, CompilerConfig::default().trusted_issuer);
}

#[test]
fn test_age_threshold_rejects_minor() {
    let mut attributes = IdentityAttributes::demo();
    attributes.date_of_birth_ms = born_years_ago(17);
    assert!(verify_badge("age-16", attributes.clone()).is_ok());
    assert!(matches!(
        verify_badge("age-18", attributes),
        Err(VerifierError::VerificationFailed(_))
    ));
}

#[test]
fn test_age_21_needs_21_years() {
    let mut attributes = IdentityAttributes::demo();
    attributes.date_of_birth_ms = born_years_ago(20);
    assert!(verify_badge("age-18", attributes.clone()).is_ok());
    assert!(verify_badge("age-21", attributes).is_err());
}

#[test]
fn test_non_us_nationality() {
    assert!(verify_badge("non-us", IdentityAttributes::demo()).is_ok());

    let mut us = IdentityAttributes::demo();
    us.nationality = "US".into();
    let err = verify_badge("non-us", us).unwrap_err();
    assert!(matches!(err, VerifierError::VerificationFailed(_)));
}

#[test]
fn test_residency_badges() {
    // Demo residency is DE: inside the EU and on the preferred list.
    assert!(verify_badge("eu-resident", IdentityAttributes::demo()).is_ok());
    assert!(verify_badge("allowed-country", IdentityAttributes::demo()).is_ok());

    let mut canadian = IdentityAttributes::demo();
    canadian.residency = "CA".into();
    assert!(verify_badge("eu-resident", canadian.clone()).is_err());
    assert!(verify_badge("allowed-country", canadian).is_ok());
}

#[test]
fn test_kyc_tiers() {
    let mut tier_one = IdentityAttributes::demo();
    tier_one.kyc_tier = 1;
    assert!(verify_badge("kyc-basic", tier_one.clone()).is_ok());
    assert!(verify_badge("kyc-advanced", tier_one).is_err());
    assert!(verify_badge("kyc-advanced", IdentityAttributes::demo()).is_ok());
}

#[test]
fn test_flag_and_email_badges() {
    for badge in ["sanctions-clear", "email-verified", "email-domain", "proof-of-unique"] {
        assert!(
            verify_badge(badge, IdentityAttributes::demo()).is_ok(),
            "{badge} should verify for the demo identity"
        );
    }

    let mut flagged = IdentityAttributes::demo();
    flagged.sanctions_cleared = false;
    flagged.email_verified = false;
    flagged.email_domain = "example.com".into();
    flagged.unique_hash = "42".into();
    for badge in ["sanctions-clear", "email-verified", "email-domain", "proof-of-unique"] {
        assert!(verify_badge(badge, flagged.clone()).is_err(), "{badge} should fail");
    }
}

#[test]
fn test_untrusted_issuer_rejected() {
    let lifecycle = lifecycle();
    let issued = lifecycle.issue("age-18", None).unwrap();
    let rogue = holder_from(&KeyPair::from_secret("rogue issuer"), IdentityAttributes::demo());
    let err = submit(&lifecycle, &issued, "age-18", &rogue).unwrap_err();
    assert!(matches!(err, VerifierError::VerificationFailed(_)));
}

#[test]
fn test_presentation_for_other_origin_rejected() {
    let lifecycle = lifecycle();
    let issued = lifecycle.issue("age-18", Some(ORIGIN)).unwrap();
    let presentation_json = holder(IdentityAttributes::demo())
        .create_presentation_json(&issued.request_json, "https://phish.example")
        .unwrap();
    let result = lifecycle.verify(&PresentationSubmission {
        request_id: issued.request_id.clone(),
        badge_id: Some("age-18".into()),
        presentation_json,
        origin: None,
    });
    assert!(matches!(result, Err(VerifierError::VerificationFailed(_))));
}

// =========================================================================
// Request lifecycle
// =========================================================================

#[test]
fn test_badge_mismatch_keeps_request_valid() {
    let lifecycle = lifecycle();
    let signer = holder(IdentityAttributes::demo());
    let issued = lifecycle.issue("age-18", None).unwrap();

    let err = submit(&lifecycle, &issued, "age-21", &signer).unwrap_err();
    assert!(matches!(err, VerifierError::BadgeMismatch { .. }));
    assert_eq!(lifecycle.status(&issued.request_id), Some(RequestState::Issued));

    assert!(submit(&lifecycle, &issued, "age-18", &signer).is_ok());
}

#[test]
fn test_success_is_single_use() {
    let lifecycle = lifecycle();
    let signer = holder(IdentityAttributes::demo());
    let issued = lifecycle.issue("kyc-basic", None).unwrap();

    assert!(submit(&lifecycle, &issued, "kyc-basic", &signer).is_ok());
    assert!(matches!(
        submit(&lifecycle, &issued, "kyc-basic", &signer),
        Err(VerifierError::RequestNotFound)
    ));
    assert_eq!(lifecycle.status(&issued.request_id), None);
}

#[test]
fn test_unknown_and_consumed_are_indistinguishable() {
    let lifecycle = lifecycle();
    let signer = holder(IdentityAttributes::demo());
    let issued = lifecycle.issue("age-16", None).unwrap();
    submit(&lifecycle, &issued, "age-16", &signer).unwrap();

    let consumed = submit(&lifecycle, &issued, "age-16", &signer).unwrap_err();
    let unknown = lifecycle
        .verify(&PresentationSubmission {
            request_id: "never-issued".into(),
            badge_id: Some("age-16".into()),
            presentation_json: "{}".into(),
            origin: None,
        })
        .unwrap_err();
    assert_eq!(consumed.to_string(), unknown.to_string());
}

#[test]
fn test_failed_verification_allows_retry() {
    let lifecycle = lifecycle();
    let issued = lifecycle.issue("non-us", None).unwrap();
    let mut us = IdentityAttributes::demo();
    us.nationality = "US".into();

    assert!(submit(&lifecycle, &issued, "non-us", &holder(us)).is_err());
    assert!(submit(&lifecycle, &issued, "non-us", &holder(IdentityAttributes::demo())).is_ok());
}

#[test]
fn test_expired_request_is_swept() {
    let lifecycle = lifecycle();
    let signer = holder(IdentityAttributes::demo());
    let stale = lifecycle.issue("age-18", None).unwrap();
    let mut entry = lifecycle.store().get(&stale.request_id).unwrap();
    entry.created_at = Utc::now() - Duration::minutes(6);
    lifecycle.store().insert(stale.request_id.clone(), entry);
    assert_eq!(lifecycle.status(&stale.request_id), Some(RequestState::Expired));

    // Any successful verification sweeps the stale entry.
    let fresh = lifecycle.issue("age-18", None).unwrap();
    submit(&lifecycle, &fresh, "age-18", &signer).unwrap();

    assert!(!lifecycle.store().contains(&stale.request_id));
    assert!(matches!(
        submit(&lifecycle, &stale, "age-18", &signer),
        Err(VerifierError::RequestNotFound)
    ));
}

// =========================================================================
// Specification cache
// =========================================================================

/// Counts `precompile` calls on the local engine.
#[derive(Default)]
struct CountingEngine {
    inner: LocalAttestationEngine,
    precompiles: AtomicUsize,
}

impl AttestationEngine for CountingEngine {
    fn precompile(&self, spec: ConstraintSpec) -> Result<CompiledSpec, AttestError> {
        self.precompiles.fetch_add(1, Ordering::SeqCst);
        self.inner.precompile(spec)
    }

    fn issue_request(
        &self,
        spec: &CompiledSpec,
        claims: RequestClaims,
        action: &str,
    ) -> Result<PresentationRequest, AttestError> {
        self.inner.issue_request(spec, claims, action)
    }

    fn verify(
        &self,
        request: &PresentationRequest,
        presentation: &Presentation,
        context: &VerifyContext,
    ) -> Result<IssuerOutput, AttestError> {
        self.inner.verify(request, presentation, context)
    }

    fn create_presentation(
        &self,
        owner: &KeyPair,
        input: PresentationInput<'_>,
    ) -> Result<Presentation, AttestError> {
        self.inner.create_presentation(owner, input)
    }
}

#[test]
fn test_repeated_requests_compile_once() {
    let engine = Arc::new(CountingEngine::default());
    let lifecycle = lifecycle_with(engine.clone(), LifecycleConfig::default());
    let catalog = BadgeCatalog::demo();

    for _ in 0..3 {
        for badge in catalog.badges() {
            lifecycle.issue(&badge.id, None).unwrap();
        }
    }

    assert_eq!(engine.precompiles.load(Ordering::SeqCst), catalog.len());
    assert_eq!(lifecycle.store().len(), catalog.len() * 3);
}
