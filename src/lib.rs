//! # card-battle
//!
//! A turn-based card-battle core driven by a small effect language.
//!
//! ## Design Principles
//!
//! 1. **Content is text**: Cards, relics, abilities and status effects are
//!    authored as effect strings (`OP.hp-6, ME.block+3`) and interpreted at
//!    runtime. Content may be machine-generated, so a malformed unit is
//!    skipped and logged, never fatal to the battle.
//!
//! 2. **Explicit services**: The executor owns the combat state, the status
//!    definition store, the attribute registry and the parse cache. Nothing
//!    is global; hosts inject an event sink and a card chooser.
//!
//! 3. **Deterministic**: All randomness comes from a seeded `GameRng`, and
//!    the full state can be checkpointed with bincode.
//!
//! ## Architecture
//!
//! - **Re-entrant execution**: Effects trigger abilities and status effects
//!   that run further effect strings. Nesting is bounded, and deaths are
//!   resolved once the outermost batch finishes.
//!
//! - **Persistent Data Structures**: Abilities and statuses are `im::Vector`s,
//!   so dispatch iterates an O(1) snapshot while effects mutate the live list.
//!
//! ## Modules
//!
//! - `core`: Sides, combatants, state, RNG, configuration, errors
//! - `cards`: Cards, piles and the card-selector grammar
//! - `effects`: Parser, evaluators, modifiers and the effect executor
//! - `status`: Status definitions, instances and their lifecycle
//! - `triggers`: Abilities, trigger dispatch and battle events
//! - `battle`: Snapshots, turn flow, action queue and results

pub mod battle;
pub mod cards;
pub mod core;
pub mod effects;
pub mod status;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{
    BattleConfig, BattleError, BattleOutcome, CombatState, Combatant, EffectError, Enemy,
    EnemyActionOrder, GameRng, GameRngState, Player, Relic, Side, SideMap,
};

pub use crate::cards::{Card, CardChooser, CardSelector, CardType, Pile, Piles};

pub use crate::effects::{
    parse_effect_string, process_stacks_expression, AttributeRegistry, EffectExecutor,
    EffectExpression, ExecutionContext, ModifierType,
};

pub use crate::status::{StacksChange, StatusDefinitionStore, StatusEffectDefinition, StatusType};

pub use crate::triggers::{Ability, BattleEvent, EventLog, EventSink, TriggerKind};

pub use crate::battle::{ActionQueue, BattleAction, BattleResult, BattleSession, BattleSnapshot};
