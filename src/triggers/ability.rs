//! Abilities and trigger keywords.
//!
//! An ability is a stored `trigger_name(effects...)` string attached to a
//! combatant. Dispatch re-extracts the trigger name and inner effects from
//! the stored text every time it fires, so the text is the single source of
//! truth.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lifecycle events abilities can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    BattleStart,
    TurnStart,
    TurnEnd,
    CardPlayed,
    TakeDamage,
    DealDamage,
    TakeHeal,
    GainBlock,
    LoseBlock,
    GainBuff,
    GainDebuff,
    LustIncrease,
    LustOverflow,
    /// Never dispatched; read by the modifier resolver.
    Passive,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 14] = [
        TriggerKind::BattleStart,
        TriggerKind::TurnStart,
        TriggerKind::TurnEnd,
        TriggerKind::CardPlayed,
        TriggerKind::TakeDamage,
        TriggerKind::DealDamage,
        TriggerKind::TakeHeal,
        TriggerKind::GainBlock,
        TriggerKind::LoseBlock,
        TriggerKind::GainBuff,
        TriggerKind::GainDebuff,
        TriggerKind::LustIncrease,
        TriggerKind::LustOverflow,
        TriggerKind::Passive,
    ];

    /// The keyword used in effect strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TriggerKind::BattleStart => "battle_start",
            TriggerKind::TurnStart => "turn_start",
            TriggerKind::TurnEnd => "turn_end",
            TriggerKind::CardPlayed => "card_played",
            TriggerKind::TakeDamage => "take_damage",
            TriggerKind::DealDamage => "deal_damage",
            TriggerKind::TakeHeal => "take_heal",
            TriggerKind::GainBlock => "gain_block",
            TriggerKind::LoseBlock => "lose_block",
            TriggerKind::GainBuff => "gain_buff",
            TriggerKind::GainDebuff => "gain_debuff",
            TriggerKind::LustIncrease => "lust_increase",
            TriggerKind::LustOverflow => "lust_overflow",
            TriggerKind::Passive => "passive",
        }
    }

    /// Look up a keyword.
    #[must_use]
    pub fn from_keyword(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Is `name` a recognized trigger keyword?
#[must_use]
pub fn is_trigger_keyword(name: &str) -> bool {
    TriggerKind::from_keyword(name).is_some()
}

static TRIGGER_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*([A-Za-z_][A-Za-z0-9_]*)\((.*)\)\s*$").expect("valid trigger regex")
});

/// Split `name(inner)` into its trigger name and inner effect text.
///
/// Returns `None` when the text is not wrapped.
#[must_use]
pub fn extract_trigger(effect: &str) -> Option<(&str, &str)> {
    let caps = TRIGGER_WRAPPER.captures(effect)?;
    let name = caps.get(1)?.as_str();
    let inner = caps.get(2)?.as_str();
    Some((name, inner.trim()))
}

/// A stored `(trigger, effect)` pair.
///
/// Duplicates are allowed and fire independently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    /// Trigger keyword the ability listens to.
    pub trigger: String,
    /// The full wrapped effect text, e.g. `turn_start(ME.block+3)`.
    pub effect: String,
    #[serde(default)]
    pub description: String,
}

impl Ability {
    /// Build an ability from wrapped effect text.
    ///
    /// Returns `None` if the text is not of the form `trigger(...)`.
    pub fn from_effect(id: impl Into<String>, effect: impl Into<String>) -> Option<Self> {
        let effect = effect.into();
        let trigger = extract_trigger(&effect)?.0.to_string();
        Some(Self {
            id: id.into(),
            trigger,
            effect,
            description: String::new(),
        })
    }

    /// Set the description (builder pattern).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Inner effect text, if the stored effect still matches the wrapper
    /// pattern for `trigger`.
    #[must_use]
    pub fn inner_for(&self, trigger: &str) -> Option<&str> {
        match extract_trigger(&self.effect) {
            Some((name, inner)) if name == trigger => Some(inner),
            _ => None,
        }
    }
}
