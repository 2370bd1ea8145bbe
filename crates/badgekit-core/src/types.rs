use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A single eligibility rule over identity attributes.
///
/// Wire form is internally tagged by `type`, e.g.
/// `{"type": "age", "minYears": 18}` or
/// `{"type": "nationality", "disallowed": ["US"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Rule {
    /// Holder is at least `min_years` old at the claimed timestamp.
    Age { min_years: u32 },
    /// Nationality is (or is not) in a set of country codes.
    Nationality(ListRule),
    /// Residency is (or is not) in a set of country codes.
    Residency(ListRule),
    /// KYC tier is at least `min_tier`.
    KycTier { min_tier: u64 },
    /// Holder has cleared sanctions screening.
    SanctionsClear,
    /// Holder's email address has been verified.
    EmailVerified,
    /// Email domain is one of `allowed_domains`.
    EmailDomain { allowed_domains: Vec<String> },
    /// Holder's uniqueness hash equals the configured value.
    UniqueHash,
    /// Any tag this build does not understand. Kept so that catalogs still
    /// load; compiling a badge that carries one fails.
    #[serde(other)]
    Unsupported,
}

impl Rule {
    /// Short tag used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Age { .. } => "age",
            Self::Nationality(_) => "nationality",
            Self::Residency(_) => "residency",
            Self::KycTier { .. } => "kyc-tier",
            Self::SanctionsClear => "sanctions-clear",
            Self::EmailVerified => "email-verified",
            Self::EmailDomain { .. } => "email-domain",
            Self::UniqueHash => "unique-hash",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Age { min_years } => write!(f, "age>={}", min_years),
            Self::KycTier { min_tier } => write!(f, "kyc-tier>={}", min_tier),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Configuration of a country-list rule: exactly one of `allowed` or
/// `disallowed`, and that list must not be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed: Option<Vec<String>>,
}

/// The validated side of a [`ListRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSelection<'a> {
    Allowed(&'a [String]),
    Disallowed(&'a [String]),
}

impl ListRule {
    /// An allow-list rule.
    pub fn allowed<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(values.into_iter().map(Into::into).collect()),
            disallowed: None,
        }
    }

    /// A deny-list rule.
    pub fn disallowed<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: None,
            disallowed: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Check the exactly-one, non-empty invariant and return the active list.
    pub fn selection(&self) -> Result<ListSelection<'_>, CoreError> {
        match (&self.allowed, &self.disallowed) {
            (Some(allowed), None) if !allowed.is_empty() => Ok(ListSelection::Allowed(allowed)),
            (None, Some(disallowed)) if !disallowed.is_empty() => {
                Ok(ListSelection::Disallowed(disallowed))
            }
            (Some(_), Some(_)) => Err(CoreError::InvalidRule(
                "list rule must carry only one of allowed/disallowed".into(),
            )),
            (None, None) => Err(CoreError::InvalidRule(
                "list rule missing configuration".into(),
            )),
            _ => Err(CoreError::InvalidRule("list rule values cannot be empty".into())),
        }
    }
}

/// A named, reusable eligibility rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Unique identifier, e.g. `age-18`.
    pub id: String,
    pub label: String,
    pub description: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Rules, all of which must hold.
    pub rules: Vec<Rule>,
}

impl Badge {
    /// Public view of the badge, without its rules.
    pub fn summary(&self) -> BadgeSummary {
        BadgeSummary {
            id: self.id.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            tone: self.tone.clone(),
        }
    }
}

/// Display metadata of a badge as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeSummary {
    pub id: String,
    pub label: String,
    pub description: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}
