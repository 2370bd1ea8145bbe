/// Attestation engine errors.
#[derive(Debug, thiserror::Error)]
pub enum AttestError {
    #[error("invalid constraint specification: {0}")]
    InvalidSpec(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("presentation does not answer this request: {0}")]
    RequestBinding(String),

    #[error("verifier identity mismatch: expected {expected}, got {actual}")]
    VerifierMismatch { expected: String, actual: String },

    #[error("request expired: {age_ms}ms old, valid for {validity_ms}ms")]
    RequestExpired { age_ms: u64, validity_ms: u64 },

    #[error("constraint {index} not satisfied: {constraint}")]
    ConstraintFailed { index: usize, constraint: String },

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] badgekit_crypto::CryptoError),

    #[error("core error: {0}")]
    Core(#[from] badgekit_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AttestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
