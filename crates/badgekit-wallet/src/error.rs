/// Wallet bridge errors. Display strings double as `lastError` values.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Mina wallet provider not detected")]
    ProviderNotDetected,

    #[error("Wallet provider missing method {0}")]
    MissingMethod(String),

    /// Error reported by the provider itself.
    #[error("{0}")]
    Wallet(String),

    #[error("Wallet returned unexpected presentation payload")]
    UnexpectedWalletResponse,

    #[error("wallet call {method} timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    #[error("invalid presentation request: {0}")]
    InvalidRequest(String),

    #[error("simulated signer error: {0}")]
    Signer(#[from] badgekit_attest::AttestError),
}
