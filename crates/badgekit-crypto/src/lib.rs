pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use error::CryptoError;
pub use hashing::{hash, hash_domain, merkle_root, Hash};
pub use keys::{KeyPair, PublicKey};
pub use signing::{sign, verify, Signature};
