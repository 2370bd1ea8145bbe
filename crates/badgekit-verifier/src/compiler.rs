//! Rule compiler: badge rules to cached, engine-compiled constraint specs.

use dashmap::DashMap;
use std::sync::Arc;

use badgekit_attest::{AttestationEngine, CompiledSpec, Constraint, ConstraintSpec, Operand};
use badgekit_core::{
    Attribute, AttributeValue, ListSelection, Rule, DEMO_ISSUER_SECRET, DEMO_UNIQUE_HASH,
    MILLIS_PER_YEAR,
};
use badgekit_crypto::{KeyPair, PublicKey};

use crate::error::VerifierError;

/// Values the compiler bakes into every specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Identity every credential's issuer must equal.
    pub trusted_issuer: String,
    /// Value `unique-hash` rules pin.
    pub unique_hash: String,
}

impl CompilerConfig {
    pub fn for_issuer(issuer: &PublicKey) -> Self {
        Self {
            trusted_issuer: issuer.fingerprint(),
            unique_hash: DEMO_UNIQUE_HASH.to_string(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::for_issuer(&KeyPair::from_secret(DEMO_ISSUER_SECRET).public_key())
    }
}

/// Compiles badge rules and caches the result per badge id for the
/// lifetime of the compiler.
///
/// Concurrent first compilations of one badge may both run; the last
/// insert wins. Callers must not rely on `Arc` identity across calls.
pub struct RuleCompiler {
    engine: Arc<dyn AttestationEngine>,
    config: CompilerConfig,
    cache: DashMap<String, Arc<CompiledSpec>>,
}

impl RuleCompiler {
    pub fn new(engine: Arc<dyn AttestationEngine>, config: CompilerConfig) -> Self {
        Self {
            engine,
            config,
            cache: DashMap::new(),
        }
    }

    /// Compiled specification for `badge_id`. A cache hit returns the stored
    /// value without looking at `rules`.
    pub fn compile(&self, badge_id: &str, rules: &[Rule]) -> Result<Arc<CompiledSpec>, VerifierError> {
        if let Some(cached) = self.cache.get(badge_id) {
            tracing::debug!(badge_id, "compiled spec cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        let spec = build_spec(&self.config, rules)?;
        let compiled = Arc::new(self.engine.precompile(spec)?);
        self.cache.insert(badge_id.to_string(), Arc::clone(&compiled));

        tracing::info!(
            badge_id,
            rules = rules.len(),
            fingerprint = %compiled.fingerprint,
            "badge compiled"
        );
        Ok(compiled)
    }

    /// Cached specification, if `badge_id` has been compiled.
    pub fn cached(&self, badge_id: &str) -> Option<Arc<CompiledSpec>> {
        self.cache.get(badge_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }
}

/// Conjunction of an issuer pin followed by one assertion per rule, in order.
pub fn build_spec(config: &CompilerConfig, rules: &[Rule]) -> Result<ConstraintSpec, VerifierError> {
    if rules.is_empty() {
        return Err(VerifierError::RuleConfiguration("badge has no rules".into()));
    }

    let mut assertions = Vec::with_capacity(rules.len() + 1);
    assertions.push(Constraint::equals(
        Operand::Issuer,
        Operand::constant(AttributeValue::Text(config.trusted_issuer.clone())),
    ));
    for rule in rules {
        assertions.push(rule_assertion(config, rule)?);
    }
    Ok(ConstraintSpec::new(assertions))
}

/// The assertion a single rule contributes.
pub fn rule_assertion(config: &CompilerConfig, rule: &Rule) -> Result<Constraint, VerifierError> {
    let assertion = match rule {
        Rule::Age { min_years } => {
            let threshold = u64::from(*min_years)
                .checked_mul(MILLIS_PER_YEAR)
                .ok_or_else(|| VerifierError::RuleConfiguration(format!("{} overflows", rule)))?;
            Constraint::less_than_eq(
                Operand::property(Attribute::DateOfBirthMs),
                Operand::sub(
                    Operand::ClaimedTimestamp,
                    Operand::constant(AttributeValue::Integer(threshold)),
                ),
            )
        }
        Rule::Nationality(list) | Rule::Residency(list) => {
            let attribute = match rule {
                Rule::Nationality(_) => Attribute::Nationality,
                _ => Attribute::Residency,
            };
            let selection = list
                .selection()
                .map_err(|e| VerifierError::RuleConfiguration(format!("{}: {}", rule.kind(), e)))?;
            match selection {
                ListSelection::Allowed(values) => membership(attribute, values)?,
                ListSelection::Disallowed(values) => Constraint::not(membership(attribute, values)?),
            }
        }
        Rule::KycTier { min_tier } => Constraint::less_than_eq(
            Operand::constant(AttributeValue::Integer(*min_tier)),
            Operand::property(Attribute::KycTier),
        ),
        Rule::SanctionsClear => is_true(Attribute::SanctionsCleared),
        Rule::EmailVerified => is_true(Attribute::EmailVerified),
        Rule::EmailDomain { allowed_domains } => membership(Attribute::EmailDomain, allowed_domains)?,
        Rule::UniqueHash => Constraint::equals(
            Operand::property(Attribute::UniqueHash),
            Operand::constant(AttributeValue::Field(config.unique_hash.clone())),
        ),
        Rule::Unsupported => {
            return Err(VerifierError::RuleConfiguration("unsupported rule type".into()));
        }
    };
    Ok(assertion)
}

/// Left-to-right OR of `nodes`; a single node is returned as is.
pub fn or_fold(nodes: Vec<Constraint>) -> Option<Constraint> {
    nodes.into_iter().reduce(Constraint::or)
}

fn membership(attribute: Attribute, values: &[String]) -> Result<Constraint, VerifierError> {
    let equalities = values
        .iter()
        .map(|value| {
            Constraint::equals(
                Operand::property(attribute),
                Operand::constant(AttributeValue::Text(value.clone())),
            )
        })
        .collect();
    or_fold(equalities).ok_or_else(|| {
        VerifierError::RuleConfiguration(format!("{} list cannot be empty", attribute))
    })
}

fn is_true(attribute: Attribute) -> Constraint {
    Constraint::equals(
        Operand::property(attribute),
        Operand::constant(AttributeValue::Boolean(true)),
    )
}
