/// Rule compilation and request lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("rule configuration error: {0}")]
    RuleConfiguration(String),

    #[error("unknown badge type: {0}")]
    UnknownBadge(String),

    #[error("attestation engine issued a request without a nonce")]
    NonceMissing,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("request expired or unknown")]
    RequestNotFound,

    #[error("badge mismatch: request was issued for {expected}")]
    BadgeMismatch { expected: String, actual: Option<String> },

    #[error("malformed presentation: {0}")]
    MalformedPresentation(String),

    #[error("{0}")]
    VerificationFailed(String),

    #[error("attestation error: {0}")]
    Attest(#[from] badgekit_attest::AttestError),
}
