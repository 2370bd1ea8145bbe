//! Badge Kit Verifier: compiles badge rules into cached constraint
//! specifications and runs the single-use presentation request lifecycle.

pub mod compiler;
pub mod error;
pub mod lifecycle;

pub use compiler::{build_spec, or_fold, rule_assertion, CompilerConfig, RuleCompiler};
pub use error::VerifierError;
pub use lifecycle::{
    IssuedRequest, LifecycleConfig, PresentationSubmission, RequestLifecycle, RequestStore,
    StoredRequest, VerificationOutcome,
};
