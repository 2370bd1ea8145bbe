//! Boolean constraint expressions over credential attributes.
//!
//! A [`ConstraintSpec`] is a conjunction of [`Constraint`] assertions. Each
//! assertion compares [`Operand`]s drawn from the credential, the claimed
//! timestamp bound into the request, or constants.

use badgekit_core::{Attribute, AttributeKind, AttributeValue, IdentityAttributes};
use badgekit_crypto::{hash_domain, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AttestError;

/// Value type of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    Text,
    Integer,
    Boolean,
    Field,
}

impl From<AttributeKind> for OperandType {
    fn from(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::Text { .. } => Self::Text,
            AttributeKind::Integer => Self::Integer,
            AttributeKind::Boolean => Self::Boolean,
            AttributeKind::Field => Self::Field,
        }
    }
}

impl From<&AttributeValue> for OperandType {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Text(_) => Self::Text,
            AttributeValue::Integer(_) => Self::Integer,
            AttributeValue::Boolean(_) => Self::Boolean,
            AttributeValue::Field(_) => Self::Field,
        }
    }
}

/// A value-producing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Operand {
    /// A credential attribute.
    Property { attribute: Attribute },
    /// Identity of the credential's issuer (text).
    Issuer,
    /// The `createdAt` claim of the request, in milliseconds.
    ClaimedTimestamp,
    Constant { value: AttributeValue },
    /// Integer subtraction. Underflow is an evaluation error.
    Sub {
        left: Box<Operand>,
        right: Box<Operand>,
    },
}

impl Operand {
    pub fn property(attribute: Attribute) -> Self {
        Self::Property { attribute }
    }

    pub fn constant(value: AttributeValue) -> Self {
        Self::Constant { value }
    }

    pub fn sub(left: Operand, right: Operand) -> Self {
        Self::Sub {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Static type of this operand.
    pub fn operand_type(&self) -> Result<OperandType, AttestError> {
        match self {
            Self::Property { attribute } => Ok(attribute.kind().into()),
            Self::Issuer => Ok(OperandType::Text),
            Self::ClaimedTimestamp => Ok(OperandType::Integer),
            Self::Constant { value } => Ok(value.into()),
            Self::Sub { left, right } => {
                let (l, r) = (left.operand_type()?, right.operand_type()?);
                if l != OperandType::Integer || r != OperandType::Integer {
                    return Err(AttestError::TypeMismatch(format!(
                        "subtraction needs integers, got {:?} and {:?}",
                        l, r
                    )));
                }
                Ok(OperandType::Integer)
            }
        }
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<AttributeValue, AttestError> {
        match self {
            Self::Property { attribute } => Ok(ctx.attributes.value(*attribute)),
            Self::Issuer => Ok(AttributeValue::Text(ctx.issuer.to_string())),
            Self::ClaimedTimestamp => Ok(AttributeValue::Integer(ctx.claimed_timestamp)),
            Self::Constant { value } => Ok(value.clone()),
            Self::Sub { left, right } => {
                let l = expect_integer(left.evaluate(ctx)?)?;
                let r = expect_integer(right.evaluate(ctx)?)?;
                l.checked_sub(r).map(AttributeValue::Integer).ok_or_else(|| {
                    AttestError::Evaluation(format!("{} - {} underflows", l, r))
                })
            }
        }
    }
}

fn expect_integer(value: AttributeValue) -> Result<u64, AttestError> {
    match value {
        AttributeValue::Integer(i) => Ok(i),
        other => Err(AttestError::TypeMismatch(format!(
            "expected integer, got {}",
            other
        ))),
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property { attribute } => write!(f, "{}", attribute),
            Self::Issuer => write!(f, "issuer"),
            Self::ClaimedTimestamp => write!(f, "claimedTimestamp"),
            Self::Constant { value } => write!(f, "{}", value),
            Self::Sub { left, right } => write!(f, "({} - {})", left, right),
        }
    }
}

/// A boolean node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Constraint {
    Equals { left: Operand, right: Operand },
    LessThanEq { left: Operand, right: Operand },
    Or {
        left: Box<Constraint>,
        right: Box<Constraint>,
    },
    Not { inner: Box<Constraint> },
}

impl Constraint {
    pub fn equals(left: Operand, right: Operand) -> Self {
        Self::Equals { left, right }
    }

    pub fn less_than_eq(left: Operand, right: Operand) -> Self {
        Self::LessThanEq { left, right }
    }

    pub fn or(left: Constraint, right: Constraint) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(inner: Constraint) -> Self {
        Self::Not {
            inner: Box::new(inner),
        }
    }

    /// Check that compared operands agree in type and ordered comparisons
    /// are over integers.
    pub fn type_check(&self) -> Result<(), AttestError> {
        match self {
            Self::Equals { left, right } => {
                let (l, r) = (left.operand_type()?, right.operand_type()?);
                if l != r {
                    return Err(AttestError::TypeMismatch(format!(
                        "{} == {} compares {:?} with {:?}",
                        left, right, l, r
                    )));
                }
                Ok(())
            }
            Self::LessThanEq { left, right } => {
                let (l, r) = (left.operand_type()?, right.operand_type()?);
                if l != OperandType::Integer || r != OperandType::Integer {
                    return Err(AttestError::TypeMismatch(format!(
                        "{} <= {} needs integers",
                        left, right
                    )));
                }
                Ok(())
            }
            Self::Or { left, right } => {
                left.type_check()?;
                right.type_check()
            }
            Self::Not { inner } => inner.type_check(),
        }
    }

    /// Evaluate against a credential's attributes.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, AttestError> {
        match self {
            Self::Equals { left, right } => {
                Ok(left.evaluate(ctx)?.canonical() == right.evaluate(ctx)?.canonical())
            }
            Self::LessThanEq { left, right } => {
                let l = expect_integer(left.evaluate(ctx)?)?;
                let r = expect_integer(right.evaluate(ctx)?)?;
                Ok(l <= r)
            }
            Self::Or { left, right } => Ok(left.evaluate(ctx)? || right.evaluate(ctx)?),
            Self::Not { inner } => Ok(!inner.evaluate(ctx)?),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { left, right } => write!(f, "{} == {}", left, right),
            Self::LessThanEq { left, right } => write!(f, "{} <= {}", left, right),
            Self::Or { left, right } => write!(f, "({} || {})", left, right),
            Self::Not { inner } => write!(f, "!({})", inner),
        }
    }
}

/// Inputs an assertion is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub attributes: &'a IdentityAttributes,
    pub issuer: &'a str,
    pub claimed_timestamp: u64,
}

/// A conjunction of assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub assertions: Vec<Constraint>,
}

impl ConstraintSpec {
    pub fn new(assertions: Vec<Constraint>) -> Self {
        Self { assertions }
    }

    /// Domain-separated digest of the canonical JSON encoding.
    pub fn digest(&self) -> Result<Hash, AttestError> {
        let encoded = serde_json::to_vec(self)?;
        Ok(hash_domain("badgekit:constraint-spec", &[&encoded]))
    }

    /// Index of the first assertion that does not hold, if any.
    pub fn first_failure(&self, ctx: &EvalContext<'_>) -> Result<Option<usize>, AttestError> {
        for (index, assertion) in self.assertions.iter().enumerate() {
            if !assertion.evaluate(ctx)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}
