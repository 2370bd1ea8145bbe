use std::fmt;

use crate::error::CoreError;

/// The states of a presentation request, keyed by its nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Issued and awaiting a presentation.
    Issued,
    /// Used by a verification attempt. Final state.
    Consumed,
    /// Older than the request TTL but still held by the store.
    Expired,
    /// Reclaimed by an expiry sweep. Final state.
    Removed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "Issued"),
            Self::Consumed => write!(f, "Consumed"),
            Self::Expired => write!(f, "Expired"),
            Self::Removed => write!(f, "Removed"),
        }
    }
}

/// Events that move a request between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    /// A verification attempt used the request.
    Consume,
    /// The request outlived its TTL.
    Expire,
    /// An expiry sweep reclaimed the request.
    Sweep,
}

/// Request state transitions.
///
/// Valid transitions:
/// - Issued → Consumed (Consume)
/// - Issued → Expired (Expire)
/// - Expired → Removed (Sweep)
pub struct RequestStateMachine;

impl RequestStateMachine {
    /// Attempt a state transition based on an event.
    pub fn transition(current: RequestState, event: RequestEvent) -> Result<RequestState, CoreError> {
        let new_state = match (current, event) {
            (RequestState::Issued, RequestEvent::Consume) => RequestState::Consumed,
            (RequestState::Issued, RequestEvent::Expire) => RequestState::Expired,
            (RequestState::Expired, RequestEvent::Sweep) => RequestState::Removed,
            _ => {
                let target = match event {
                    RequestEvent::Consume => RequestState::Consumed,
                    RequestEvent::Expire => RequestState::Expired,
                    RequestEvent::Sweep => RequestState::Removed,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::trace!(
            from = %current,
            to = %new_state,
            event = ?event,
            "request state transition"
        );

        Ok(new_state)
    }
}
