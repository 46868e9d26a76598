//! Trigger system for event-driven abilities.
//!
//! ## Key Components
//!
//! - [`TriggerKind`]: The lifecycle events an ability can listen to
//! - [`Ability`]: A stored `trigger(effects...)` string on a combatant
//! - [`BattleEvent`]: Structured notification emitted to an [`EventSink`]
//!
//! Abilities, status definitions with event keys and the player's relics
//! all react to the same events. Dispatch order for one event is abilities,
//! then statuses, then relics.
//!
//! ## Example Usage
//!
//! ```
//! use card_battle::core::{BattleConfig, CombatState, Combatant, Enemy, Player, Side};
//! use card_battle::effects::{EffectExecutor, ExecutionContext};
//! use card_battle::status::StatusDefinitionStore;
//! use card_battle::triggers::{EventLog, TriggerKind};
//!
//! let player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
//! let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
//! let log = EventLog::new();
//! let mut exec = EffectExecutor::new(
//!     CombatState::new(player, enemy, 1),
//!     StatusDefinitionStore::new(),
//!     BattleConfig::new(),
//! )
//! .with_sink(log.clone());
//!
//! exec.add_ability(Side::Player, "lose_block(OP.hp-2)").unwrap();
//! exec.execute_effect_string("ME.block+5", true, ExecutionContext::new()).unwrap();
//! exec.execute_effect_string("OP.hp-3", false, ExecutionContext::new()).unwrap();
//!
//! assert_eq!(exec.state().enemy.combatant.current_hp, 28.0);
//! assert_eq!(log.triggered(), vec!["lose_block"]);
//! assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::Passive), 0);
//! ```

pub mod ability;
mod dispatch;
pub mod event;

pub use ability::{extract_trigger, is_trigger_keyword, Ability, TriggerKind};
pub use event::{BattleEvent, EventLog, EventSink, NullSink, TracingSink};
