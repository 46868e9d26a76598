//! Modifier Resolver.
//!
//! A modifier adjusts a base amount at its point of use (damage dealt,
//! damage taken, lust dealt/taken, block gained). Sources, scanned in
//! order:
//!
//! 1. `passive(...)` segments of the player's relics
//! 2. `hold` texts of every held status, with `stacks` substituted
//! 3. the combatant's directly stored `modifiers[type]` value
//!
//! `+`/`-` terms sum into `add`; `*`/`/` terms multiply into `mul`.
//! The composed amount is always `(base + add) * mul`: the same breakdown
//! drives both the mutation path and any display of it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::attributes::is_modifier;
use super::eval::evaluate_number;
use super::variables::{format_number, map_paths};
use crate::core::{CombatState, Side};
use crate::status::StatusDefinitionStore;
use crate::triggers::ability::extract_trigger;

/// The five modifier kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierType {
    Damage,
    DamageTaken,
    LustDamage,
    LustDamageTaken,
    Block,
}

impl ModifierType {
    pub const ALL: [ModifierType; 5] = [
        ModifierType::Damage,
        ModifierType::DamageTaken,
        ModifierType::LustDamage,
        ModifierType::LustDamageTaken,
        ModifierType::Block,
    ];

    /// Attribute name in effect strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ModifierType::Damage => "damage_modifier",
            ModifierType::DamageTaken => "damage_taken_modifier",
            ModifierType::LustDamage => "lust_damage_modifier",
            ModifierType::LustDamageTaken => "lust_damage_taken_modifier",
            ModifierType::Block => "block_modifier",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == name)
    }
}

/// Composed additive and multiplicative parts of a modifier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierBreakdown {
    pub add: f64,
    pub mul: f64,
}

impl Default for ModifierBreakdown {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ModifierBreakdown {
    pub const IDENTITY: Self = Self { add: 0.0, mul: 1.0 };

    /// Apply to a base amount: `(base + add) * mul`.
    #[must_use]
    pub fn apply(self, base: f64) -> f64 {
        (base + self.add) * self.mul
    }

    #[must_use]
    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    /// Fold one `op value` term in.
    fn absorb(&mut self, ty: ModifierType, op: &str, value: f64, source: &str) {
        match op {
            "+" => self.add += value,
            "-" => self.add -= value,
            "*" => self.mul *= value,
            "/" if value == 0.0 => {
                warn!(modifier = ty.as_str(), source, "modifier divides by zero; ignored");
            }
            "/" => self.mul /= value,
            _ => {
                warn!(
                    modifier = ty.as_str(),
                    source,
                    "'{op}' is not supported in modifier composition; ignored"
                );
            }
        }
    }
}

static MODIFIER_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^A-Za-z0-9_.])(?:ME\.)?(damage_modifier|damage_taken_modifier|lust_damage_modifier|lust_damage_taken_modifier|block_modifier)\s*([+\-*/=])\s*([0-9.]+(?:\s*[*/]\s*[0-9.]+)*)",
    )
    .expect("valid modifier regex")
});

/// Substitute the bare `stacks` token and qualify bare modifier names
/// with `ME.`.
///
/// Idempotent: qualified names and `X.stacks.<id>` paths are untouched.
///
/// ```
/// use card_battle::effects::process_stacks_expression;
///
/// let once = process_stacks_expression("damage_modifier+stacks", 3);
/// assert_eq!(once, "ME.damage_modifier+3");
/// assert_eq!(process_stacks_expression(&once, 3), once);
/// ```
#[must_use]
pub fn process_stacks_expression(text: &str, stacks: u32) -> String {
    map_paths(text, |path| match path {
        "stacks" => Some(format_number(f64::from(stacks))),
        name if is_modifier(name) => Some(format!("ME.{name}")),
        _ => None,
    })
    .into_owned()
}

/// The `passive(...)` segments of a relic effect string.
#[must_use]
pub fn passive_segments(effect: &str) -> Vec<&str> {
    super::parser::split_units(effect)
        .into_iter()
        .filter_map(extract_trigger)
        .filter(|(name, _)| *name == "passive")
        .map(|(_, inner)| inner)
        .collect()
}

/// Scan `text` for terms of `ty` and fold them into `breakdown`.
fn scan(text: &str, ty: ModifierType, breakdown: &mut ModifierBreakdown) {
    for caps in MODIFIER_TERM.captures_iter(text) {
        if caps.get(1).map(|m| m.as_str()) != Some(ty.as_str()) {
            continue;
        }
        let (Some(op), Some(raw_value)) = (caps.get(2), caps.get(3)) else {
            continue;
        };
        match evaluate_number(raw_value.as_str()) {
            Some(value) => breakdown.absorb(ty, op.as_str(), value, text),
            None => warn!(modifier = ty.as_str(), source = text, "unreadable modifier value"),
        }
    }
}

/// Compose the modifier of `ty` for `side`.
#[must_use]
pub fn resolve_modifier(
    state: &CombatState,
    store: &StatusDefinitionStore,
    side: Side,
    ty: ModifierType,
) -> ModifierBreakdown {
    let mut breakdown = ModifierBreakdown::IDENTITY;

    if side == Side::Player {
        for relic in &state.player.relics {
            for segment in passive_segments(&relic.effect) {
                scan(segment, ty, &mut breakdown);
            }
        }
    }

    let combatant = state.combatant(side);
    for status in &combatant.status_effects {
        let Some(def) = store.get(&status.id) else {
            continue;
        };
        for hold in def.triggers.hold.iter() {
            scan(&process_stacks_expression(hold, status.stacks), ty, &mut breakdown);
        }
    }

    if let Some(direct) = combatant.modifiers.get(ty.as_str()) {
        breakdown.add += direct;
    }

    breakdown
}

/// Additive total of a modifier.
#[must_use]
pub fn compute_modifier(
    state: &CombatState,
    store: &StatusDefinitionStore,
    side: Side,
    ty: ModifierType,
) -> f64 {
    resolve_modifier(state, store, side, ty).add
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Combatant, Enemy, Player, Relic};
    use crate::status::{StatusEffectDefinition, StatusEffectInstance, StatusTriggerKind, StatusType};

    fn state_with(
        player_status: Option<(&StatusEffectDefinition, u32)>,
        relic: Option<&str>,
    ) -> CombatState {
        let mut player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
        if let Some((def, stacks)) = player_status {
            player
                .combatant
                .status_effects
                .push_back(StatusEffectInstance::from_definition(def, stacks));
        }
        if let Some(effect) = relic {
            player.relics.push(Relic::new("r", "Relic", effect));
        }
        CombatState::new(player, Enemy::new(Combatant::new("Slime", 30.0, 40.0)), 1)
    }

    fn hold(id: &str, text: &str) -> StatusEffectDefinition {
        StatusEffectDefinition::new(id, id, StatusType::Buff).with_trigger(StatusTriggerKind::Hold, text)
    }

    #[test]
    fn test_process_stacks_expression() {
        assert_eq!(
            process_stacks_expression("damage_modifier+2", 3),
            "ME.damage_modifier+2"
        );
        assert_eq!(
            process_stacks_expression("ME.damage_modifier+0.25*stacks", 4),
            "ME.damage_modifier+0.25*4"
        );
        assert_eq!(
            process_stacks_expression("OP.hp-stacks, ME.stacks.burn", 2),
            "OP.hp-2, ME.stacks.burn"
        );
    }

    #[test]
    fn test_hold_stacks_scaled() {
        let def = hold("fury", "ME.damage_modifier+0.25*stacks");
        let state = state_with(Some((&def, 4)), None);
        let mut store = StatusDefinitionStore::new();
        store.define(def);

        let b = resolve_modifier(&state, &store, Side::Player, ModifierType::Damage);
        assert_eq!(b.add, 1.0);
        assert_eq!(b.mul, 1.0);
        assert!(resolve_modifier(&state, &store, Side::Player, ModifierType::Block).is_identity());
    }

    #[test]
    fn test_sources_compose() {
        let def = hold("weak", "damage_modifier*0.5");
        let mut state = state_with(Some((&def, 1)), Some("passive(ME.damage_modifier+2)"));
        state.player.combatant.modifiers.insert("damage_modifier".into(), 1.0);
        let mut store = StatusDefinitionStore::new();
        store.define(def);

        let b = resolve_modifier(&state, &store, Side::Player, ModifierType::Damage);
        assert_eq!(b.add, 3.0);
        assert_eq!(b.mul, 0.5);
        assert_eq!(b.apply(6.0), 4.5);
        assert_eq!(compute_modifier(&state, &store, Side::Player, ModifierType::Damage), 3.0);
    }

    #[test]
    fn test_name_boundaries() {
        let def = hold("mix", "ME.lust_damage_modifier+5, OP.damage_modifier+9, ME.damage_taken_modifier-1");
        let state = state_with(Some((&def, 1)), None);
        let mut store = StatusDefinitionStore::new();
        store.define(def);

        let dmg = resolve_modifier(&state, &store, Side::Player, ModifierType::Damage);
        assert!(dmg.is_identity());
        let lust = resolve_modifier(&state, &store, Side::Player, ModifierType::LustDamage);
        assert_eq!(lust.add, 5.0);
        let taken = resolve_modifier(&state, &store, Side::Player, ModifierType::DamageTaken);
        assert_eq!(taken.add, -1.0);
    }

    #[test]
    fn test_set_is_ignored() {
        let def = hold("odd", "ME.damage_modifier=5");
        let state = state_with(Some((&def, 1)), None);
        let mut store = StatusDefinitionStore::new();
        store.define(def);
        assert!(resolve_modifier(&state, &store, Side::Player, ModifierType::Damage).is_identity());
    }

    #[test]
    fn test_relic_non_passive_ignored() {
        let state = state_with(None, Some("battle_start(ME.damage_modifier+5), passive(ME.block_modifier+1)"));
        let store = StatusDefinitionStore::new();
        assert!(resolve_modifier(&state, &store, Side::Player, ModifierType::Damage).is_identity());
        assert_eq!(
            resolve_modifier(&state, &store, Side::Player, ModifierType::Block).add,
            1.0
        );
        assert_eq!(passive_segments("passive(a+1), turn_start(b)"), vec!["a+1"]);
    }
}
