//! Parsed effect units.
//!
//! The parser turns an effect string into a list of `EffectExpression`s,
//! one per comma/newline separated unit. An expression is built fresh for
//! every parse and consumed by the executor; only the parse cache keeps it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::CardSelector;

/// Relative target of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// The invoking side (the status holder inside status triggers).
    Me,
    /// The invoking side's opponent.
    Op,
    /// Both sides; expanded into `Me` then `Op` before execution.
    All,
}

impl Target {
    /// Parse a target prefix token.
    #[must_use]
    pub fn from_prefix(token: &str) -> Option<Self> {
        match token {
            "ME" => Some(Target::Me),
            "OP" => Some(Target::Op),
            "ALL" => Some(Target::All),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Target::Me => "ME",
            Target::Op => "OP",
            Target::All => "ALL",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `+`
    Increase,
    /// `-`
    Decrease,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `=`
    Set,
    /// `status.apply(...)`
    Apply,
    /// `status.remove(...)` / `ability.remove(...)`
    Remove,
    /// `ability.add(...)` and bare `trigger(...)` wrappers
    Add,
}

impl Operator {
    /// Parse an arithmetic operator character.
    #[must_use]
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Increase),
            '-' => Some(Operator::Decrease),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            '=' => Some(Operator::Set),
            _ => None,
        }
    }

    /// Parse a verb (`apply`, `remove`, `add`).
    #[must_use]
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "apply" => Some(Operator::Apply),
            "remove" => Some(Operator::Remove),
            "add" => Some(Operator::Add),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Increase => "+",
            Operator::Decrease => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Set => "=",
            Operator::Apply => "apply",
            Operator::Remove => "remove",
            Operator::Add => "add",
        }
    }

    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Operator::Increase
                | Operator::Decrease
                | Operator::Multiply
                | Operator::Divide
                | Operator::Set
        )
    }

    /// Apply an arithmetic operator to a current value.
    ///
    /// Returns `None` for verbs, division by zero and non-finite results.
    #[must_use]
    pub fn apply(self, current: f64, value: f64) -> Option<f64> {
        let result = match self {
            Operator::Increase => Some(current + value),
            Operator::Decrease => Some(current - value),
            Operator::Multiply => Some(current * value),
            Operator::Divide if value == 0.0 => None,
            Operator::Divide => Some(current / value),
            Operator::Set => Some(value),
            Operator::Apply | Operator::Remove | Operator::Add => None,
        };
        result.filter(|r| r.is_finite())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a unit, classified once at parse time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectValue {
    /// A plain number.
    Literal(f64),
    /// A single variable path (`max_hp`, `ME.block`, `OP.stacks.burn`).
    VariableRef(String),
    /// Arithmetic over numbers and variable paths (`ME.block*2+1`).
    Expression(String),
    /// Verb payload (`burn 3`, `turn_start(ME.block+1)`).
    Text(String),
}

impl fmt::Display for EffectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectValue::Literal(n) => write!(f, "{n}"),
            EffectValue::VariableRef(s) | EffectValue::Expression(s) | EffectValue::Text(s) => {
                f.write_str(s)
            }
        }
    }
}

/// One executable unit of an effect string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectExpression {
    /// Source text of this unit.
    pub raw: String,
    pub target: Option<Target>,
    /// Registry key (`hp`, `status`, `draw`, `if`, ...).
    pub attribute: String,
    pub operator: Option<Operator>,
    pub value: Option<EffectValue>,
    /// Card selector for card-domain attributes.
    pub selector: Option<CardSelector>,
    /// Status id for `status.*` and `stacks.<id>` units.
    pub status_id: Option<String>,
    pub condition: Option<String>,
    pub true_effect: Option<String>,
    pub false_effect: Option<String>,
    /// Optional third status payload token (`status.apply(burn 3 2)`).
    pub duration: Option<u32>,
    /// Trigger name when the unit is a wrapped ability.
    pub prefix: Option<String>,
    pub is_valid: bool,
    pub error_message: Option<String>,
    /// Human-readable summary for logs and tooltips.
    pub description: Option<String>,
}

impl EffectExpression {
    /// An empty, valid expression for `attribute`.
    pub fn new(raw: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            target: None,
            attribute: attribute.into(),
            operator: None,
            value: None,
            selector: None,
            status_id: None,
            condition: None,
            true_effect: None,
            false_effect: None,
            duration: None,
            prefix: None,
            is_valid: true,
            error_message: None,
            description: None,
        }
    }

    /// An invalid expression carrying its error.
    pub fn invalid(raw: impl Into<String>, message: impl Into<String>) -> Self {
        let mut expr = Self::new(raw, "");
        expr.is_valid = false;
        expr.error_message = Some(message.into());
        expr
    }

    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    #[must_use]
    pub fn is_variable_reference(&self) -> bool {
        matches!(self.value, Some(EffectValue::VariableRef(_)))
    }

    /// Copy of this unit retargeted (used for `ALL` expansion).
    #[must_use]
    pub fn retargeted(&self, target: Target) -> Self {
        let mut copy = self.clone();
        copy.target = Some(target);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_apply() {
        assert_eq!(Operator::Increase.apply(5.0, 2.0), Some(7.0));
        assert_eq!(Operator::Decrease.apply(5.0, 2.0), Some(3.0));
        assert_eq!(Operator::Multiply.apply(5.0, 2.0), Some(10.0));
        assert_eq!(Operator::Divide.apply(5.0, 2.0), Some(2.5));
        assert_eq!(Operator::Divide.apply(5.0, 0.0), None);
        assert_eq!(Operator::Set.apply(5.0, 2.0), Some(2.0));
        assert_eq!(Operator::Apply.apply(5.0, 2.0), None);
        assert_eq!(Operator::Multiply.apply(1e308, 10.0), None);
        assert_eq!(Operator::Set.apply(5.0, f64::NAN), None);
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::from_symbol('='), Some(Operator::Set));
        assert_eq!(Operator::from_symbol('x'), None);
        assert_eq!(Operator::from_verb("remove"), Some(Operator::Remove));
        assert!(Operator::Set.is_arithmetic());
        assert!(!Operator::Add.is_arithmetic());
    }

    #[test]
    fn test_retargeted() {
        let mut expr = EffectExpression::new("ALL.hp-3", "hp");
        expr.target = Some(Target::All);
        let me = expr.retargeted(Target::Me);
        assert_eq!(me.target, Some(Target::Me));
        assert_eq!(me.raw, "ALL.hp-3");
    }

    #[test]
    fn test_invalid() {
        let expr = EffectExpression::invalid("??", "bad");
        assert!(!expr.is_valid);
        assert_eq!(expr.error_message.as_deref(), Some("bad"));
    }
}
