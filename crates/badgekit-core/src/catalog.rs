//! Badge catalog: the immutable set of badges a relying party offers.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::CoreError;
use crate::types::{Badge, BadgeSummary, ListRule, Rule};

/// ISO 3166-1 alpha-2 codes of the 27 EU member states.
pub const EU_COUNTRIES: [&str; 27] = [
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

/// Ordered badge collection with lookup by identifier.
#[derive(Debug, Clone)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
    index: HashMap<String, usize>,
}

/// On-disk TOML layout: a `[[badges]]` array.
#[derive(Deserialize)]
struct CatalogFile {
    badges: Vec<Badge>,
}

impl BadgeCatalog {
    /// Build a catalog, rejecting duplicate identifiers and rule-less badges.
    ///
    /// Rule configuration itself is not checked here; a malformed rule only
    /// fails when its badge is compiled.
    pub fn new(badges: Vec<Badge>) -> Result<Self, CoreError> {
        let mut index = HashMap::with_capacity(badges.len());
        for (position, badge) in badges.iter().enumerate() {
            if badge.rules.is_empty() {
                return Err(CoreError::InvalidCatalog(format!(
                    "badge {} has no rules",
                    badge.id
                )));
            }
            if index.insert(badge.id.clone(), position).is_some() {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate badge id {}",
                    badge.id
                )));
            }
        }
        Ok(Self { badges, index })
    }

    /// Parse a JSON array of badges.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let badges: Vec<Badge> =
            serde_json::from_str(json).map_err(|e| CoreError::Parse(e.to_string()))?;
        Self::new(badges)
    }

    /// Parse a TOML document with a `[[badges]]` array.
    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        let file: CatalogFile =
            toml::from_str(source).map_err(|e| CoreError::Parse(e.to_string()))?;
        Self::new(file.badges)
    }

    /// Load a catalog file; `.toml` files are read as TOML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            _ => Self::from_json_str(&contents)?,
        };
        tracing::info!(path = %path.display(), badges = catalog.len(), "badge catalog loaded");
        Ok(catalog)
    }

    /// Look up a badge by identifier.
    pub fn get(&self, id: &str) -> Option<&Badge> {
        self.index.get(id).map(|&i| &self.badges[i])
    }

    /// Badges in catalog order.
    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    /// Public summaries in catalog order.
    pub fn summaries(&self) -> Vec<BadgeSummary> {
        self.badges.iter().map(Badge::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    /// The built-in demo catalog.
    pub fn demo() -> Self {
        let badge = |id: &str, label: &str, description: &str, icon: &str, tone: &str, rule| {
            Badge {
                id: id.into(),
                label: label.into(),
                description: description.into(),
                icon: icon.into(),
                tone: Some(tone.into()),
                rules: vec![rule],
            }
        };

        let badges = vec![
            badge("age-16", "Age 16+", "Unlock teen-rated experiences.", "UserRoundCheck", "light",
                Rule::Age { min_years: 16 }),
            badge("age-18", "Age 18+", "Required for mature surfaces.", "ShieldCheck", "bold",
                Rule::Age { min_years: 18 }),
            badge("age-21", "Age 21+", "Compliance for US beverages / venues.", "ShieldCheck", "bold",
                Rule::Age { min_years: 21 }),
            badge("non-us", "Non-US Person", "Exclude US nationals for token sales.", "Globe", "light",
                Rule::Nationality(ListRule::disallowed(["US"]))),
            badge("eu-resident", "EU Residency", "GDPR-protected participants only.", "Globe2", "light",
                Rule::Residency(ListRule::allowed(EU_COUNTRIES))),
            badge("allowed-country", "Preferred Countries", "Whitelist CA / DE / JP", "MapPin", "light",
                Rule::Residency(ListRule::allowed(["CA", "DE", "JP"]))),
            badge("kyc-basic", "KYC Tier 1", "Minimum ID submission.", "IdCard", "light",
                Rule::KycTier { min_tier: 1 }),
            badge("kyc-advanced", "KYC Tier 2", "Enhanced diligence completed.", "IdCard", "bold",
                Rule::KycTier { min_tier: 2 }),
            badge("sanctions-clear", "Sanctions Screen", "OFAC / global watchlists cleared.", "Shield", "light",
                Rule::SanctionsClear),
            badge("email-verified", "Email Verified", "Inbox confirmed via zk-email.", "MailCheck", "light",
                Rule::EmailVerified),
            badge("email-domain", "Company Email", "Only minabadges.dev staff.", "Mail", "light",
                Rule::EmailDomain { allowed_domains: vec!["minabadges.dev".into()] }),
            badge("proof-of-unique", "Unique Human", "Sybil-resistant hash bound.", "Fingerprint", "bold",
                Rule::UniqueHash),
        ];

        let index = badges
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();
        Self { badges, index }
    }
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        Self::demo()
    }
}
