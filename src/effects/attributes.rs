//! Attribute Registry.
//!
//! Static table of every attribute an effect unit may name, with its
//! category, display name and execution priority. Units in one effect
//! string run in ascending priority; conditionals always run last.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::expression::EffectExpression;

/// What kind of state an attribute touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeCategory {
    /// Numeric combatant stats.
    Basic,
    /// Directly stored modifier values.
    Modifier,
    /// Status effects and their stacks.
    Status,
    /// Ability list.
    Ability,
    /// Card piles and card costs.
    Card,
    /// `if` and `passive`.
    Special,
}

/// One registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub category: AttributeCategory,
    pub display_name: String,
    /// Lower runs first.
    pub priority: u32,
}

impl AttributeDefinition {
    pub fn new(
        name: impl Into<String>,
        category: AttributeCategory,
        display_name: impl Into<String>,
        priority: u32,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            display_name: display_name.into(),
            priority,
        }
    }
}

/// Priority given to conditional units, after everything else.
pub const CONDITIONAL_PRIORITY: u32 = u32::MAX;

/// Priority for units whose attribute is not registered. They fail at
/// execution anyway; the sort just needs a slot for them.
const UNKNOWN_PRIORITY: u32 = u32::MAX - 1;

/// Modifier attribute names.
pub const MODIFIER_ATTRIBUTES: [&str; 5] = [
    "damage_modifier",
    "damage_taken_modifier",
    "lust_damage_modifier",
    "lust_damage_taken_modifier",
    "block_modifier",
];

/// Attributes that always act on the player, whoever invokes them.
pub const PLAYER_ONLY_ATTRIBUTES: [&str; 6] =
    ["energy", "max_energy", "draw", "discard", "exhaust", "cost"];

const STANDARD: &[(&str, AttributeCategory, &str, u32)] = &[
    ("damage_modifier", AttributeCategory::Modifier, "Damage Modifier", 5),
    ("damage_taken_modifier", AttributeCategory::Modifier, "Damage Taken Modifier", 5),
    ("lust_damage_modifier", AttributeCategory::Modifier, "Lust Damage Modifier", 5),
    ("lust_damage_taken_modifier", AttributeCategory::Modifier, "Lust Damage Taken Modifier", 5),
    ("block_modifier", AttributeCategory::Modifier, "Block Modifier", 5),
    ("max_hp", AttributeCategory::Basic, "Max HP", 10),
    ("max_lust", AttributeCategory::Basic, "Max Lust", 10),
    ("max_energy", AttributeCategory::Basic, "Max Energy", 10),
    ("block", AttributeCategory::Basic, "Block", 20),
    ("hp", AttributeCategory::Basic, "HP", 30),
    ("lust", AttributeCategory::Basic, "Lust", 30),
    ("energy", AttributeCategory::Basic, "Energy", 40),
    ("status", AttributeCategory::Status, "Status", 50),
    ("stacks", AttributeCategory::Status, "Stacks", 50),
    ("ability", AttributeCategory::Ability, "Ability", 60),
    ("draw", AttributeCategory::Card, "Draw", 70),
    ("discard", AttributeCategory::Card, "Discard", 70),
    ("exhaust", AttributeCategory::Card, "Exhaust", 70),
    ("cost", AttributeCategory::Card, "Cost", 70),
    ("passive", AttributeCategory::Special, "Passive", 90),
    ("if", AttributeCategory::Special, "Condition", CONDITIONAL_PRIORITY),
];

/// Name aliases accepted in effect strings.
const ALIASES: &[(&str, &str)] = &[("current_hp", "hp"), ("current_lust", "lust")];

/// Registry of attribute definitions.
///
/// ## Example
///
/// ```
/// use card_battle::effects::{AttributeCategory, AttributeRegistry};
///
/// let registry = AttributeRegistry::standard();
/// let hp = registry.get("hp").unwrap();
/// assert_eq!(hp.category, AttributeCategory::Basic);
/// assert!(registry.get("block").unwrap().priority < hp.priority);
/// assert_eq!(registry.canonical("current_hp"), "hp");
/// ```
#[derive(Clone, Debug, Default)]
pub struct AttributeRegistry {
    definitions: FxHashMap<String, AttributeDefinition>,
}

impl AttributeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in attribute table.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for &(name, category, display, priority) in STANDARD {
            registry.register(AttributeDefinition::new(name, category, display, priority));
        }
        registry
    }

    /// Register or replace a definition.
    pub fn register(&mut self, def: AttributeDefinition) {
        self.definitions.insert(def.name.clone(), def);
    }

    /// Resolve an alias to its registered name.
    #[must_use]
    pub fn canonical<'a>(&self, name: &'a str) -> &'a str {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |&(_, canonical)| canonical)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.definitions.get(self.canonical(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Sort key for a unit.
    #[must_use]
    pub fn priority_of(&self, expr: &EffectExpression) -> u32 {
        if expr.is_conditional() {
            return CONDITIONAL_PRIORITY;
        }
        self.get(&expr.attribute)
            .map_or(UNKNOWN_PRIORITY, |def| def.priority)
    }

    /// Does this attribute always target the player?
    #[must_use]
    pub fn is_player_only(name: &str) -> bool {
        PLAYER_ONLY_ATTRIBUTES.contains(&name)
    }
}

/// Is `name` a modifier attribute?
#[must_use]
pub fn is_modifier(name: &str) -> bool {
    MODIFIER_ATTRIBUTES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_priorities() {
        let registry = AttributeRegistry::standard();
        let p = |name: &str| registry.get(name).unwrap().priority;

        assert!(p("damage_modifier") < p("max_hp"));
        assert!(p("max_hp") < p("block"));
        assert!(p("block") < p("hp"));
        assert_eq!(p("hp"), p("lust"));
        assert!(p("energy") < p("status"));
        assert!(p("status") < p("ability"));
        assert!(p("ability") < p("draw"));
        assert!(p("draw") < p("passive"));
        assert_eq!(p("if"), CONDITIONAL_PRIORITY);
    }

    #[test]
    fn test_aliases() {
        let registry = AttributeRegistry::standard();
        assert_eq!(registry.get("current_lust").unwrap().name, "lust");
        assert!(!registry.contains("mana"));
    }

    #[test]
    fn test_conditional_priority() {
        let registry = AttributeRegistry::standard();
        let mut expr = EffectExpression::new("if[1>0][ME.hp+1]", "if");
        expr.condition = Some("1>0".into());
        assert_eq!(registry.priority_of(&expr), CONDITIONAL_PRIORITY);

        let unknown = EffectExpression::new("ME.mana+1", "mana");
        assert!(registry.priority_of(&unknown) > registry.priority_of(&EffectExpression::new("", "passive")));
    }

    #[test]
    fn test_player_only() {
        assert!(AttributeRegistry::is_player_only("energy"));
        assert!(AttributeRegistry::is_player_only("draw"));
        assert!(!AttributeRegistry::is_player_only("hp"));
        assert!(is_modifier("block_modifier"));
        assert!(!is_modifier("block"));
    }
}
