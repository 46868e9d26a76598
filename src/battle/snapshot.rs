//! Inbound and outbound battle snapshots.
//!
//! The host keeps battle entities in its own JSON variable store, with
//! camelCase keys. A [`BattleSnapshot`] is that document: it is loaded into
//! a [`CombatState`] at battle start and written back from one on demand.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cards::{Card, Piles};
use crate::core::{BattleConfig, BattleError, CombatState, Combatant, Enemy, Player, Relic};
use crate::status::{StatusDefinitionStore, StatusEffectInstance, StatusType};
use crate::triggers::{extract_trigger, Ability};

fn default_max_lust() -> f64 {
    100.0
}

fn default_max_energy() -> f64 {
    3.0
}

fn default_stacks() -> u32 {
    1
}

/// A held status as the host stores it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub id: String,
    #[serde(default = "default_stacks")]
    pub stacks: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub status_type: Option<StatusType>,
}

/// An ability as the host stores it. `trigger` and `id` are optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub trigger: String,
    pub effect: String,
    #[serde(default)]
    pub description: String,
}

/// Stats both sides share.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantSnapshot {
    pub name: String,
    pub max_hp: f64,
    /// Missing means full hp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hp: Option<f64>,
    #[serde(default = "default_max_lust")]
    pub max_lust: f64,
    #[serde(default)]
    pub current_lust: f64,
    #[serde(default)]
    pub block: f64,
    #[serde(default)]
    pub status_effects: Vec<StatusEntry>,
    #[serde(default)]
    pub abilities: Vec<AbilityEntry>,
    #[serde(default, alias = "overflowEffect", skip_serializing_if = "Option::is_none")]
    pub lust_overflow_effect: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    #[serde(flatten)]
    pub stats: CombatantSnapshot,
    #[serde(default = "default_max_energy")]
    pub max_energy: f64,
    /// Missing means full energy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default)]
    pub relics: Vec<Relic>,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub draw_pile: Vec<Card>,
    #[serde(default)]
    pub discard_pile: Vec<Card>,
    #[serde(default)]
    pub exhaust_pile: Vec<Card>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemySnapshot {
    #[serde(flatten)]
    pub stats: CombatantSnapshot,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// The whole battle document.
///
/// ```
/// use card_battle::battle::BattleSnapshot;
/// use card_battle::core::BattleConfig;
///
/// let snapshot = BattleSnapshot::from_json(r#"{
///     "player": {"name": "Hero", "maxHp": 50, "drawPile": [{"id": "strike", "name": "Strike", "cost": 1, "effect": "OP.hp-6"}]},
///     "enemy": {"name": "Slime", "maxHp": 30, "actions": ["OP.hp-5"]}
/// }"#).unwrap();
/// let (state, _store) = snapshot.into_state(&BattleConfig::new());
/// assert_eq!(state.player.combatant.current_hp, 50.0);
/// assert_eq!(state.player.piles.draw_pile[0].uid, 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    pub player: PlayerSnapshot,
    pub enemy: EnemySnapshot,
    /// Status definitions, possibly nested in arrays.
    #[serde(default)]
    pub status_definitions: Value,
    #[serde(default)]
    pub turn: u32,
}

impl BattleSnapshot {
    pub fn from_json(json: &str) -> Result<Self, BattleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, BattleError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build the combat state and status store this snapshot describes.
    ///
    /// Held statuses without a definition and abilities whose text is not a
    /// trigger wrapper are dropped with a warning.
    #[must_use]
    pub fn into_state(self, config: &BattleConfig) -> (CombatState, StatusDefinitionStore) {
        let mut store = StatusDefinitionStore::new();
        store.load_value(&self.status_definitions);

        let mut piles = Piles::new();
        piles.hand = self.player.hand;
        piles.draw_pile = self.player.draw_pile;
        piles.discard_pile = self.player.discard_pile;
        piles.exhaust_pile = self.player.exhaust_pile;
        piles.assign_uids();

        let max_stacks = config.default_max_stacks;
        let combatant = load_combatant(self.player.stats, &store, max_stacks);
        let mut player = Player::new(combatant, self.player.max_energy);
        player.energy = self.player.energy.unwrap_or(player.max_energy).max(0.0);
        player.relics = self.player.relics;
        player.piles = piles;

        let mut enemy = Enemy::new(load_combatant(self.enemy.stats, &store, max_stacks));
        enemy.actions = self.enemy.actions;

        let mut state = CombatState::new(player, enemy, config.seed);
        state.turn = self.turn;
        debug!(
            player = %state.player.combatant.name,
            enemy = %state.enemy.combatant.name,
            statuses = store.len(),
            "battle snapshot loaded"
        );
        (state, store)
    }

    /// Capture a state for write-back.
    pub fn capture(state: &CombatState, store: &StatusDefinitionStore) -> Result<Self, BattleError> {
        let player = &state.player;
        Ok(Self {
            player: PlayerSnapshot {
                stats: save_combatant(&player.combatant),
                max_energy: player.max_energy,
                energy: Some(player.energy),
                relics: player.relics.clone(),
                hand: player.piles.hand.clone(),
                draw_pile: player.piles.draw_pile.clone(),
                discard_pile: player.piles.discard_pile.clone(),
                exhaust_pile: player.piles.exhaust_pile.clone(),
            },
            enemy: EnemySnapshot {
                stats: save_combatant(&state.enemy.combatant),
                actions: state.enemy.actions.clone(),
            },
            status_definitions: store.to_value()?,
            turn: state.turn,
        })
    }
}

impl CombatState {
    /// Write this state back as a host snapshot.
    pub fn to_snapshot(&self, store: &StatusDefinitionStore) -> Result<BattleSnapshot, BattleError> {
        BattleSnapshot::capture(self, store)
    }
}

fn load_combatant(snap: CombatantSnapshot, store: &StatusDefinitionStore, max_stacks: u32) -> Combatant {
    let mut c = Combatant::new(snap.name, snap.max_hp, snap.max_lust);
    c.current_hp = snap.current_hp.unwrap_or(c.max_hp);
    c.current_lust = snap.current_lust;
    c.block = snap.block;
    c.overflow_effect = snap.lust_overflow_effect.filter(|e| !e.trim().is_empty());

    for entry in snap.status_effects {
        let Some(def) = store.get(&entry.id) else {
            warn!(status = %entry.id, combatant = %c.name, "held status has no definition; dropped");
            continue;
        };
        if c.status(&entry.id).is_some() || entry.stacks == 0 {
            continue;
        }
        c.status_effects
            .push_back(StatusEffectInstance::from_definition(def, entry.stacks.min(def.stack_cap(max_stacks))));
    }

    for (idx, entry) in snap.abilities.into_iter().enumerate() {
        let id = if entry.id.is_empty() {
            format!("loaded_{idx}")
        } else {
            entry.id
        };
        match Ability::from_effect(id, entry.effect.as_str()) {
            Some(ability) => {
                if !entry.trigger.is_empty() && entry.trigger != ability.trigger {
                    warn!(stored = %entry.trigger, effect = %entry.effect, "ability trigger disagrees with its text; using the text");
                }
                c.abilities.push_back(ability.with_description(entry.description));
            }
            None => warn!(effect = %entry.effect, combatant = %c.name, "ability is not a trigger wrapper; dropped"),
        }
    }

    c.clamp_stats();
    c
}

fn save_combatant(c: &Combatant) -> CombatantSnapshot {
    CombatantSnapshot {
        name: c.name.clone(),
        max_hp: c.max_hp,
        current_hp: Some(c.current_hp),
        max_lust: c.max_lust,
        current_lust: c.current_lust,
        block: c.block,
        status_effects: c
            .status_effects
            .iter()
            .map(|s| StatusEntry {
                id: s.id.clone(),
                stacks: s.stacks,
                name: s.name.clone(),
                status_type: Some(s.status_type),
            })
            .collect(),
        abilities: c
            .abilities
            .iter()
            .map(|a| AbilityEntry {
                id: a.id.clone(),
                trigger: extract_trigger(&a.effect).map_or_else(|| a.trigger.clone(), |(t, _)| t.to_string()),
                effect: a.effect.clone(),
                description: a.description.clone(),
            })
            .collect(),
        lust_overflow_effect: c.overflow_effect.clone(),
    }
}
