//! The effect expression language.
//!
//! Card, relic, ability and status behavior is authored as effect strings
//! such as `OP.hp-6, ME.block+3` or `if[ME.hp<10][ME.block+8]`. This module
//! turns them into state changes:
//!
//! - `parser`: splits a string into units and classifies each one
//! - `attributes`: the attribute registry (category and priority)
//! - `variables` / `eval`: `ME.`/`OP.` path substitution and arithmetic
//! - `modifiers`: damage, lust and block modifier algebra
//! - `executor`: the re-entrant interpreter that owns the combat state
//!
//! Handlers for each attribute family live next to the executor
//! (`basic`, `card_effects`), in `status::lifecycle` and in
//! `triggers::dispatch`.

pub mod attributes;
mod basic;
mod card_effects;
pub mod context;
pub mod eval;
pub mod executor;
pub mod expression;
pub mod modifiers;
pub mod parser;
pub mod variables;

pub use attributes::{AttributeCategory, AttributeDefinition, AttributeRegistry};
pub use context::{ExecutionContext, StatusContext};
pub use eval::{evaluate_arithmetic, evaluate_condition, evaluate_number};
pub use executor::EffectExecutor;
pub use expression::{EffectExpression, EffectValue, Operator, Target};
pub use modifiers::{process_stacks_expression, ModifierBreakdown, ModifierType};
pub use parser::{parse_effect_string, split_units, ParseCache};
pub use variables::VariableScope;

/// Result of executing effect units.
pub type Result<T> = std::result::Result<T, crate::core::EffectError>;
