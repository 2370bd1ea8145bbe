//! Decoding of provider replies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::BridgeError;

/// Shape of a raw provider reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    /// An object with a truthy `error` field.
    Failure(String),
    /// An object with a `result` field; holds that field.
    Wrapped(Value),
    /// Anything else, taken as is.
    Bare(Value),
}

impl ProviderReply {
    pub fn decode(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::Bare(value);
        };
        if let Some(error) = map.get("error").filter(|e| truthy(e)) {
            let message = error
                .get("message")
                .filter(|m| truthy(m))
                .map(|m| match m {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "Wallet error".to_string());
            return Self::Failure(message);
        }
        match map.remove("result") {
            Some(result) => Self::Wrapped(result),
            None => Self::Bare(Value::Object(map)),
        }
    }

    /// The unwrapped value, or the provider's error.
    pub fn into_result(self) -> Result<Value, BridgeError> {
        match self {
            Self::Failure(message) => Err(BridgeError::Wallet(message)),
            Self::Wrapped(value) | Self::Bare(value) => Ok(value),
        }
    }
}

/// Normalize a raw provider reply.
pub fn normalize(value: Value) -> Result<Value, BridgeError> {
    ProviderReply::decode(value).into_result()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Accepted shapes of a presentation reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PresentationReply {
    Bare(String),
    Presentation {
        #[serde(rename = "presentationJson")]
        presentation_json: String,
    },
    Credential {
        credential: String,
    },
}

impl PresentationReply {
    pub fn decode(value: Value) -> Result<Self, BridgeError> {
        serde_json::from_value(value).map_err(|_| BridgeError::UnexpectedWalletResponse)
    }

    /// The presentation JSON string.
    pub fn into_json(self) -> String {
        match self {
            Self::Bare(json)
            | Self::Presentation {
                presentation_json: json,
            }
            | Self::Credential { credential: json } => json,
        }
    }
}

/// Account identifiers from an accounts reply; anything but a list of
/// strings yields none.
pub fn decode_accounts(value: Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}
