//! Presentation request lifecycle: issue, single-use verify, expiry sweep.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use badgekit_attest::{
    AttestationEngine, Presentation, PresentationRequest, RequestClaims, VerifyContext,
};
use badgekit_core::{BadgeCatalog, RequestEvent, RequestState, RequestStateMachine};

use crate::compiler::RuleCompiler;
use crate::error::VerifierError;

/// Request lifecycle settings.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Prefix of the per-badge action tag, `<namespace>:badge:<id>`.
    pub namespace: String,
    /// Verifier origin used when the client names none.
    pub default_origin: String,
    pub ttl: Duration,
    /// Delete the stored request when engine verification fails.
    pub consume_on_failure: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            namespace: "minabadges".into(),
            default_origin: "http://localhost:5173".into(),
            ttl: Duration::minutes(5),
            consume_on_failure: false,
        }
    }
}

/// An in-flight request.
#[derive(Debug, Clone)]
pub struct StoredRequest {
    pub badge_id: String,
    pub request: Arc<PresentationRequest>,
    /// Expected verifier origin.
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

impl StoredRequest {
    /// `Issued` until older than `ttl`, then `Expired`.
    pub fn state(&self, now: DateTime<Utc>, ttl: Duration) -> RequestState {
        if now - self.created_at <= ttl {
            return RequestState::Issued;
        }
        RequestStateMachine::transition(RequestState::Issued, RequestEvent::Expire)
            .unwrap_or(RequestState::Expired)
    }
}

/// Nonce-keyed store of in-flight requests.
#[derive(Debug, Default)]
pub struct RequestStore {
    entries: DashMap<String, StoredRequest>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, nonce: String, entry: StoredRequest) {
        self.entries.insert(nonce, entry);
    }

    pub fn get(&self, nonce: &str) -> Option<StoredRequest> {
        self.entries.get(nonce).map(|entry| entry.value().clone())
    }

    /// Remove and return the entry. At most one caller receives it.
    pub fn take(&self, nonce: &str) -> Option<StoredRequest> {
        self.entries.remove(nonce).map(|(_, entry)| entry)
    }

    pub fn contains(&self, nonce: &str) -> bool {
        self.entries.contains_key(nonce)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry older than `ttl`. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|nonce, entry| {
            let state = entry.state(now, ttl);
            if state != RequestState::Expired {
                return true;
            }
            match RequestStateMachine::transition(state, RequestEvent::Sweep) {
                Ok(_) => false,
                Err(e) => {
                    tracing::warn!(nonce = %nonce, error = %e, "sweep skipped entry");
                    true
                }
            }
        });
        let removed = before.saturating_sub(self.entries.len());
        tracing::debug!(removed, remaining = self.entries.len(), "expired requests swept");
        removed
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRequest {
    pub badge_id: String,
    pub request_id: String,
    pub request_json: String,
    /// Advisory deadline for the client.
    pub expires_at: DateTime<Utc>,
}

/// A client's presentation, checked for shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationSubmission {
    pub request_id: String,
    pub badge_id: Option<String>,
    pub presentation_json: String,
    pub origin: Option<String>,
}

impl PresentationSubmission {
    /// Read `{requestId, badgeType, presentationJson, origin}` from a JSON
    /// body. `requestId` and `presentationJson` must be strings; the other
    /// fields are ignored unless they are strings.
    pub fn from_value(body: &Value) -> Result<Self, VerifierError> {
        let string = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        let request_id = string("requestId")
            .ok_or_else(|| VerifierError::InvalidPayload("requestId must be a string".into()))?;
        let presentation_json = string("presentationJson").ok_or_else(|| {
            VerifierError::InvalidPayload("presentationJson must be a string".into())
        })?;
        Ok(Self {
            request_id,
            badge_id: string("badgeType"),
            presentation_json,
            origin: string("origin"),
        })
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub badge_id: String,
    /// Issuer identity reported by the engine.
    pub issuer: String,
}

/// Issues presentation requests and verifies the answers, once each.
pub struct RequestLifecycle {
    catalog: Arc<BadgeCatalog>,
    compiler: Arc<RuleCompiler>,
    engine: Arc<dyn AttestationEngine>,
    store: RequestStore,
    config: LifecycleConfig,
}

impl RequestLifecycle {
    pub fn new(
        catalog: Arc<BadgeCatalog>,
        compiler: Arc<RuleCompiler>,
        engine: Arc<dyn AttestationEngine>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            catalog,
            compiler,
            engine,
            store: RequestStore::new(),
            config,
        }
    }

    pub fn catalog(&self) -> &BadgeCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Action tag a badge's presentations are scoped to.
    pub fn action_for(&self, badge_id: &str) -> String {
        format!("{}:badge:{}", self.config.namespace, badge_id)
    }

    /// Issue a request for `badge_id`, stored under its nonce.
    pub fn issue(&self, badge_id: &str, origin: Option<&str>) -> Result<IssuedRequest, VerifierError> {
        let badge = self
            .catalog
            .get(badge_id)
            .ok_or_else(|| VerifierError::UnknownBadge(badge_id.to_string()))?;
        let compiled = self.compiler.compile(&badge.id, &badge.rules)?;

        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.config.ttl).ok_or_else(|| {
            VerifierError::RuleConfiguration(format!("request ttl out of range: {}", self.config.ttl))
        })?;
        let claims = RequestClaims {
            created_at: u64::try_from(now.timestamp_millis()).unwrap_or(0),
        };
        let request = self
            .engine
            .issue_request(&compiled, claims, &self.action_for(&badge.id))?;
        let request_id = request.nonce().ok_or(VerifierError::NonceMissing)?.to_string();
        let request_json = request.to_json()?;

        let origin = origin.unwrap_or(&self.config.default_origin).to_string();
        self.store.insert(
            request_id.clone(),
            StoredRequest {
                badge_id: badge.id.clone(),
                request: Arc::new(request),
                origin: origin.clone(),
                created_at: now,
            },
        );

        tracing::info!(
            badge_id = %badge.id,
            request_id = %request_id,
            origin = %origin,
            "presentation request issued"
        );

        Ok(IssuedRequest {
            badge_id: badge.id.clone(),
            request_id,
            request_json,
            expires_at,
        })
    }

    /// Verify a submission against its stored request. Success consumes the
    /// request; see [`LifecycleConfig::consume_on_failure`] for failures.
    pub fn verify(
        &self,
        submission: &PresentationSubmission,
    ) -> Result<VerificationOutcome, VerifierError> {
        let request_id = submission.request_id.as_str();
        let stored = self
            .store
            .get(request_id)
            .ok_or(VerifierError::RequestNotFound)?;

        if submission.badge_id.as_deref() != Some(stored.badge_id.as_str()) {
            tracing::warn!(
                request_id,
                expected = %stored.badge_id,
                actual = ?submission.badge_id,
                "badge mismatch"
            );
            return Err(VerifierError::BadgeMismatch {
                expected: stored.badge_id,
                actual: submission.badge_id.clone(),
            });
        }

        // The stored origin already carries the default from issuance.
        let verifier_identity = submission
            .origin
            .clone()
            .unwrap_or_else(|| stored.origin.clone());

        let presentation = Presentation::from_json(&submission.presentation_json)
            .map_err(|e| VerifierError::MalformedPresentation(e.to_string()))?;

        let context = VerifyContext { verifier_identity };
        let output = match self.engine.verify(&stored.request, &presentation, &context) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    request_id,
                    badge_id = %stored.badge_id,
                    error = %e,
                    "presentation verification failed"
                );
                if self.config.consume_on_failure {
                    self.store.take(request_id);
                }
                return Err(VerifierError::VerificationFailed(e.to_string()));
            }
        };

        let consumed = self.store.take(request_id).ok_or(VerifierError::RequestNotFound)?;
        let state = consumed.state(Utc::now(), self.config.ttl);
        if let Err(e) = RequestStateMachine::transition(state, RequestEvent::Consume) {
            tracing::warn!(request_id, error = %e, "consumed request past its ttl");
        }
        self.sweep_expired();

        tracing::info!(
            request_id,
            badge_id = %consumed.badge_id,
            issuer = %output.issuer,
            "presentation verified"
        );

        Ok(VerificationOutcome {
            badge_id: consumed.badge_id,
            issuer: output.issuer,
        })
    }

    /// Lifecycle state of a stored request; `None` once consumed or swept.
    pub fn status(&self, request_id: &str) -> Option<RequestState> {
        self.store
            .get(request_id)
            .map(|entry| entry.state(Utc::now(), self.config.ttl))
    }

    /// Remove requests older than the TTL.
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired(Utc::now(), self.config.ttl)
    }
}
