pub mod badges;
pub mod credential;
pub mod health;
pub mod request;
pub mod verify;

/// Default badge server endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4000";

/// Origin presented to the verifier when none is given.
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";
