//! Badge Kit Core: rule model, badge catalog, identity attribute schema,
//! and request lifecycle states shared by every Badge Kit crate.

pub mod catalog;
pub mod error;
pub mod identity;
pub mod request_state;
pub mod types;

pub use catalog::{BadgeCatalog, EU_COUNTRIES};
pub use error::CoreError;
pub use identity::{
    Attribute, AttributeKind, AttributeValue, IdentityAttributes, DEMO_ISSUER_SECRET,
    DEMO_OWNER_SECRET, DEMO_UNIQUE_HASH, MILLIS_PER_YEAR,
};
pub use request_state::{RequestEvent, RequestState, RequestStateMachine};
pub use types::{Badge, BadgeSummary, ListRule, ListSelection, Rule};
