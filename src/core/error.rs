//! Error types raised by the effect engine and the battle session.

use thiserror::Error;

use super::side::Side;
use crate::cards::Pile;

/// Errors raised while executing a single effect unit.
///
/// Apart from [`EffectError::NestingLimit`], these are recoverable: the
/// executor logs them, skips the offending unit and continues the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    #[error("invalid effect syntax in '{raw}': {message}")]
    Syntax { raw: String, message: String },

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("effect on '{0}' names no target (ME/OP/ALL)")]
    MissingTarget(String),

    #[error("ALL target reached the target resolver for '{0}'")]
    UnexpandedAll(String),

    #[error("status definition '{0}' not found")]
    UnknownStatus(String),

    #[error("status '{status}' is not held by the {side}")]
    StatusNotHeld { status: String, side: Side },

    #[error("invalid value '{0}'")]
    InvalidValue(String),

    #[error("operator '{op}' is not supported for attribute '{attribute}'")]
    UnsupportedOperator { attribute: String, op: String },

    #[error("card selector '{0}' could not be resolved")]
    InvalidSelector(String),

    #[error("the {0} pile is empty")]
    EmptyPile(Pile),

    #[error("effect nesting exceeded {0} levels")]
    NestingLimit(u32),
}

impl EffectError {
    /// Whether this error aborts the rest of the batch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, EffectError::NestingLimit(_))
    }
}

/// Errors surfaced by battle-level operations.
#[derive(Debug, Error)]
pub enum BattleError {
    #[error("the battle is already over")]
    BattleOver,

    #[error("card {0} is not in hand")]
    CardNotInHand(u32),

    #[error("card costs {cost} energy but only {available} is available")]
    NotEnoughEnergy { cost: f64, available: f64 },

    #[error("the {0} is stunned")]
    Stunned(Side),

    #[error("an action is already being processed")]
    Busy,

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error("snapshot JSON error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EffectError::NestingLimit(32).is_fatal());
        assert!(!EffectError::UnknownAttribute("mana".into()).is_fatal());
        assert!(!EffectError::MissingTarget("hp".into()).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = EffectError::StatusNotHeld {
            status: "burn".into(),
            side: Side::Enemy,
        };
        assert_eq!(err.to_string(), "status 'burn' is not held by the enemy");

        let err = BattleError::NotEnoughEnergy {
            cost: 2.0,
            available: 1.0,
        };
        assert_eq!(err.to_string(), "card costs 2 energy but only 1 is available");
    }

    #[test]
    fn test_from_effect_error() {
        let err: BattleError = EffectError::NestingLimit(4).into();
        assert!(matches!(err, BattleError::Effect(EffectError::NestingLimit(4))));
    }
}
