//! Badge Kit Attest, the attestation engine capability: constraint
//! specifications, nonce-bound presentation requests, issuer-signed identity
//! credentials, and presentations.

pub mod constraint;
pub mod credential;
pub mod engine;
pub mod error;
pub mod presentation;
pub mod request;

pub use constraint::{Constraint, ConstraintSpec, EvalContext, Operand, OperandType};
pub use credential::IdentityCredential;
pub use engine::{
    now_millis, AttestationEngine, IssuerOutput, LocalAttestationEngine, LocalEngineConfig,
    PresentationInput, VerifyContext,
};
pub use error::AttestError;
pub use presentation::Presentation;
pub use request::{CompiledSpec, InputContext, PresentationRequest, RequestClaims, HTTPS_REQUEST};
