use crate::request_state::RequestState;

/// Core model errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: RequestState,
        to: RequestState,
    },

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid attribute {attribute}: {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    #[error("catalog io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    Parse(String),
}
