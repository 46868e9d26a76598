//! Combat state: everything an effect string can read or mutate.
//!
//! ## CombatState
//!
//! - The player and the enemy
//! - Turn counter and final outcome
//! - Pending-death markers, resolved at the end of an outermost effect batch
//! - The battle RNG
//!
//! `checkpoint()` / `restore()` capture the whole state in compact bincode.

use serde::{Deserialize, Serialize};

use super::combatant::{Combatant, Enemy, Player};
use super::error::BattleError;
use super::rng::GameRng;
use super::side::{Side, SideMap};

/// How a finished battle ended, from the player's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

impl BattleOutcome {
    /// Outcome for a given winning side.
    #[must_use]
    pub const fn for_winner(winner: Side) -> Self {
        match winner {
            Side::Player => BattleOutcome::Victory,
            Side::Enemy => BattleOutcome::Defeat,
        }
    }

    #[must_use]
    pub const fn winner(self) -> Side {
        match self {
            BattleOutcome::Victory => Side::Player,
            BattleOutcome::Defeat => Side::Enemy,
        }
    }
}

/// Complete mutable battle state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombatState {
    pub player: Player,
    pub enemy: Enemy,
    /// Player turn number (0 before the battle starts).
    pub turn: u32,
    pub outcome: Option<BattleOutcome>,
    /// Sides whose hp reached 0 during the current outermost batch.
    pub pending_death: SideMap<bool>,
    pub rng: GameRng,
}

impl CombatState {
    #[must_use]
    pub fn new(player: Player, enemy: Enemy, seed: u64) -> Self {
        Self {
            player,
            enemy,
            turn: 0,
            outcome: None,
            pending_death: SideMap::default(),
            rng: GameRng::new(seed),
        }
    }

    #[must_use]
    pub fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Player => &self.player.combatant,
            Side::Enemy => &self.enemy.combatant,
        }
    }

    pub fn combatant_mut(&mut self, side: Side) -> &mut Combatant {
        match side {
            Side::Player => &mut self.player.combatant,
            Side::Enemy => &mut self.enemy.combatant,
        }
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Serialize the full state, RNG position included.
    pub fn checkpoint(&self) -> Result<Vec<u8>, BattleError> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a state captured by [`CombatState::checkpoint`].
    pub fn restore(bytes: &[u8]) -> Result<Self, BattleError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
