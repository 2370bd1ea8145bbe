use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Milliseconds in a 365-day year. Age rules use this convention with no
/// leap-year adjustment.
pub const MILLIS_PER_YEAR: u64 = 365 * 24 * 60 * 60 * 1000;

/// Uniqueness hash carried by the demo identity and pinned by `unique-hash`.
pub const DEMO_UNIQUE_HASH: &str = "1252491981754763847348342345234";

/// Secret the demo holder's key pair is derived from.
pub const DEMO_OWNER_SECRET: &str = "EKEjU7M5XngsNrRZ4LGYyVh5SqRuoGQUamrgoxB9jX7SY4VXRpZS";

/// Secret the demo issuer's key pair is derived from.
pub const DEMO_ISSUER_SECRET: &str = "EKEg9DJQBhB8W49Wgf9hZrPetk2cYPXhhLxDUkAwvh5cxUAFLnqy";

const MAX_NAME_LEN: usize = 80;
const MAX_COUNTRY_LEN: usize = 2;
const MAX_DOMAIN_LEN: usize = 120;

/// Attributes of the identity credential schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    FullName,
    Nationality,
    Residency,
    DateOfBirthMs,
    KycTier,
    SanctionsCleared,
    EmailDomain,
    EmailVerified,
    UniqueHash,
}

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Bounded UTF-8 string.
    Text { max_len: usize },
    /// Unsigned 64-bit integer.
    Integer,
    Boolean,
    /// Decimal field element.
    Field,
}

impl Attribute {
    /// All schema attributes in canonical order.
    pub const ALL: [Attribute; 9] = [
        Attribute::FullName,
        Attribute::Nationality,
        Attribute::Residency,
        Attribute::DateOfBirthMs,
        Attribute::KycTier,
        Attribute::SanctionsCleared,
        Attribute::EmailDomain,
        Attribute::EmailVerified,
        Attribute::UniqueHash,
    ];

    /// Schema property name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Nationality => "nationality",
            Self::Residency => "residency",
            Self::DateOfBirthMs => "dateOfBirthMs",
            Self::KycTier => "kycTier",
            Self::SanctionsCleared => "sanctionsCleared",
            Self::EmailDomain => "emailDomain",
            Self::EmailVerified => "emailVerified",
            Self::UniqueHash => "uniqueHash",
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::FullName => AttributeKind::Text {
                max_len: MAX_NAME_LEN,
            },
            Self::Nationality | Self::Residency => AttributeKind::Text {
                max_len: MAX_COUNTRY_LEN,
            },
            Self::EmailDomain => AttributeKind::Text {
                max_len: MAX_DOMAIN_LEN,
            },
            Self::DateOfBirthMs | Self::KycTier => AttributeKind::Integer,
            Self::SanctionsCleared | Self::EmailVerified => AttributeKind::Boolean,
            Self::UniqueHash => AttributeKind::Field,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed attribute or constant value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Text(String),
    Integer(u64),
    Boolean(bool),
    Field(String),
}

impl AttributeValue {
    /// Whether this value can stand in for an attribute of `kind`.
    pub fn matches_kind(&self, kind: AttributeKind) -> bool {
        matches!(
            (self, kind),
            (Self::Text(_), AttributeKind::Text { .. })
                | (Self::Integer(_), AttributeKind::Integer)
                | (Self::Boolean(_), AttributeKind::Boolean)
                | (Self::Field(_), AttributeKind::Field)
        )
    }

    /// The same value with decimal field strings stripped of leading zeros.
    pub fn canonical(&self) -> AttributeValue {
        match self {
            Self::Field(s) => {
                let digits = s.trim_start_matches('0');
                Self::Field(if digits.is_empty() && !s.is_empty() { "0" } else { digits }.to_string())
            }
            other => other.clone(),
        }
    }

    /// Canonical byte encoding used for commitments.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.canonical() {
            Self::Text(s) => [b"t:".as_slice(), s.as_bytes()].concat(),
            Self::Integer(i) => [b"i:".as_slice(), i.to_le_bytes().as_slice()].concat(),
            Self::Boolean(b) => vec![b'b', b':', u8::from(*b)],
            Self::Field(s) => [b"f:".as_slice(), s.as_bytes()].concat(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Field(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// The private identity attributes an issuer attests to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAttributes {
    pub full_name: String,
    pub nationality: String,
    pub residency: String,
    pub date_of_birth_ms: u64,
    pub kyc_tier: u64,
    pub sanctions_cleared: bool,
    pub email_domain: String,
    pub email_verified: bool,
    pub unique_hash: String,
}

impl IdentityAttributes {
    /// The demo identity held by the simulated signer.
    pub fn demo() -> Self {
        let dob = Utc
            .with_ymd_and_hms(2000, 6, 18, 0, 0, 0)
            .single()
            .map(|d| d.timestamp_millis().unsigned_abs())
            .unwrap_or_default();
        Self {
            full_name: "Avery Basalt".into(),
            nationality: "AT".into(),
            residency: "DE".into(),
            date_of_birth_ms: dob,
            kyc_tier: 3,
            sanctions_cleared: true,
            email_domain: "minabadges.dev".into(),
            email_verified: true,
            unique_hash: DEMO_UNIQUE_HASH.into(),
        }
    }

    /// Value of a single attribute.
    pub fn value(&self, attribute: Attribute) -> AttributeValue {
        match attribute {
            Attribute::FullName => AttributeValue::Text(self.full_name.clone()),
            Attribute::Nationality => AttributeValue::Text(self.nationality.clone()),
            Attribute::Residency => AttributeValue::Text(self.residency.clone()),
            Attribute::DateOfBirthMs => AttributeValue::Integer(self.date_of_birth_ms),
            Attribute::KycTier => AttributeValue::Integer(self.kyc_tier),
            Attribute::SanctionsCleared => AttributeValue::Boolean(self.sanctions_cleared),
            Attribute::EmailDomain => AttributeValue::Text(self.email_domain.clone()),
            Attribute::EmailVerified => AttributeValue::Boolean(self.email_verified),
            Attribute::UniqueHash => AttributeValue::Field(self.unique_hash.clone()),
        }
    }

    /// Check schema bounds: string lengths and decimal field encoding.
    pub fn validate(&self) -> Result<(), CoreError> {
        for attribute in Attribute::ALL {
            match (attribute.kind(), self.value(attribute)) {
                (AttributeKind::Text { max_len }, AttributeValue::Text(s)) => {
                    if s.chars().count() > max_len {
                        return Err(CoreError::InvalidAttribute {
                            attribute: attribute.to_string(),
                            reason: format!("longer than {} characters", max_len),
                        });
                    }
                }
                (AttributeKind::Field, AttributeValue::Field(s)) => {
                    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(CoreError::InvalidAttribute {
                            attribute: attribute.to_string(),
                            reason: "field must be a decimal number".into(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
