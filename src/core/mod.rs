//! Core battle types: sides, combatants, state, RNG, configuration, errors.

pub mod combatant;
pub mod config;
pub mod error;
pub mod rng;
pub mod side;
pub mod state;

pub use combatant::{round1, Combatant, Enemy, Player, Relic};
pub use config::{BattleConfig, EnemyActionOrder};
pub use error::{BattleError, EffectError};
pub use rng::{GameRng, GameRngState};
pub use side::{Side, SideMap};
pub use state::{BattleOutcome, CombatState};
