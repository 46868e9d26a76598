//! Battle participants.
//!
//! ## Combatant
//!
//! Stats shared by both sides: hp, lust, block, held statuses, abilities,
//! direct modifier overrides and the lust-overflow effect.
//!
//! ## Player / Enemy
//!
//! The player adds energy, relics and card piles; the enemy adds its action
//! list.
//!
//! Statuses and abilities use `im::Vector` so dispatch can iterate an O(1)
//! snapshot while the effects it runs mutate the live list.

use im::Vector;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cards::Piles;
use crate::status::StatusEffectInstance;
use crate::triggers::Ability;

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    let scaled = value * 10.0;
    if scaled.is_finite() {
        scaled.round() / 10.0
    } else {
        value
    }
}

/// A relic held by the player.
///
/// The effect may contain trigger wrappers (`battle_start(...)`) and a
/// `passive(...)` segment read by the modifier resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relic {
    pub id: String,
    pub name: String,
    pub effect: String,
    #[serde(default)]
    pub description: String,
}

impl Relic {
    pub fn new(id: impl Into<String>, name: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            effect: effect.into(),
            description: String::new(),
        }
    }
}

/// Stats and attachments common to both sides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub current_hp: f64,
    pub max_hp: f64,
    pub current_lust: f64,
    pub max_lust: f64,
    pub block: f64,
    pub status_effects: Vector<StatusEffectInstance>,
    pub abilities: Vector<Ability>,
    /// Directly stored modifier values, keyed by modifier name.
    pub modifiers: FxHashMap<String, f64>,
    /// Effect run with this combatant as ME when the opponent overflows.
    pub overflow_effect: Option<String>,
}

impl Combatant {
    /// A combatant at full hp with no lust or block.
    pub fn new(name: impl Into<String>, max_hp: f64, max_lust: f64) -> Self {
        let max_hp = max_hp.max(1.0);
        Self {
            name: name.into(),
            current_hp: max_hp,
            max_hp,
            current_lust: 0.0,
            max_lust: max_lust.max(1.0),
            block: 0.0,
            status_effects: Vector::new(),
            abilities: Vector::new(),
            modifiers: FxHashMap::default(),
            overflow_effect: None,
        }
    }

    /// Set the overflow effect (builder pattern).
    #[must_use]
    pub fn with_overflow_effect(mut self, effect: impl Into<String>) -> Self {
        self.overflow_effect = Some(effect.into());
        self
    }

    /// Add an ability (builder pattern).
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push_back(ability);
        self
    }

    /// Held status by id.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<&StatusEffectInstance> {
        self.status_effects.iter().find(|s| s.id == id)
    }

    /// Index of a held status.
    #[must_use]
    pub fn status_index(&self, id: &str) -> Option<usize> {
        self.status_effects.iter().position(|s| s.id == id)
    }

    /// Stacks of a held status, 0 if absent.
    #[must_use]
    pub fn stacks_of(&self, id: &str) -> u32 {
        self.status(id).map_or(0, |s| s.stacks)
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_hp <= 0.0
    }

    /// Restore the stat invariants after an external load.
    pub fn clamp_stats(&mut self) {
        self.max_hp = round1(self.max_hp.max(1.0));
        self.max_lust = round1(self.max_lust.max(1.0));
        self.current_hp = round1(self.current_hp.clamp(0.0, self.max_hp));
        self.current_lust = round1(self.current_lust.clamp(0.0, self.max_lust));
        self.block = round1(self.block.max(0.0));
        self.status_effects.retain(|s| s.stacks > 0);
    }
}

/// The player side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub combatant: Combatant,
    pub energy: f64,
    pub max_energy: f64,
    pub relics: Vec<Relic>,
    pub piles: Piles,
}

impl Player {
    pub fn new(combatant: Combatant, max_energy: f64) -> Self {
        let max_energy = max_energy.max(1.0);
        Self {
            combatant,
            energy: max_energy,
            max_energy,
            relics: Vec::new(),
            piles: Piles::new(),
        }
    }

    /// Add a relic (builder pattern).
    #[must_use]
    pub fn with_relic(mut self, relic: Relic) -> Self {
        self.relics.push(relic);
        self
    }
}

/// The enemy side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub combatant: Combatant,
    /// Effect strings the enemy picks from on its turn.
    pub actions: Vec<String>,
    /// Next index for sequential action order.
    pub next_action: usize,
}

impl Enemy {
    pub fn new(combatant: Combatant) -> Self {
        Self {
            combatant,
            actions: Vec::new(),
            next_action: 0,
        }
    }

    /// Add an action (builder pattern).
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }
}
