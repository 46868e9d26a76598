//! Status effect definitions.
//!
//! A definition is the authored (often AI-generated) description of a
//! status: its display data, stack decay rule, stack cap and the effect
//! strings fired at each point of its lifecycle. Trigger strings are not
//! validated at load time; a malformed one fails when it fires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Buff, debuff or neither.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    Buff,
    Debuff,
    #[default]
    Neutral,
}

/// Who authored a definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Ai,
    #[default]
    System,
}

/// Automatic stack change applied at the holder's turn end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StacksChangeRepr", into = "StacksChangeRepr")]
pub enum StacksChange {
    /// No automatic change.
    #[default]
    None,
    /// Add this many stacks (usually negative), floored at 0.
    Delta(f64),
    /// Multiply by this factor and floor (`"x0.5"` halves).
    Factor(f64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StacksChangeRepr {
    Number(f64),
    Text(String),
    Missing(()),
}

impl TryFrom<StacksChangeRepr> for StacksChange {
    type Error = String;

    fn try_from(repr: StacksChangeRepr) -> Result<Self, Self::Error> {
        match repr {
            StacksChangeRepr::Number(n) => Ok(StacksChange::Delta(n)),
            StacksChangeRepr::Missing(()) => Ok(StacksChange::None),
            StacksChangeRepr::Text(text) => StacksChange::parse(&text),
        }
    }
}

impl From<StacksChange> for StacksChangeRepr {
    fn from(change: StacksChange) -> Self {
        match change {
            StacksChange::None => StacksChangeRepr::Missing(()),
            StacksChange::Delta(n) => StacksChangeRepr::Number(n),
            StacksChange::Factor(f) => StacksChangeRepr::Text(format!("x{f}")),
        }
    }
}

impl StacksChange {
    /// Parse the string form: `x<factor>` or a plain number.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(StacksChange::None);
        }
        if let Some(factor) = text.strip_prefix(['x', 'X', '*']) {
            return factor
                .trim()
                .parse::<f64>()
                .map(StacksChange::Factor)
                .map_err(|_| format!("invalid stacks factor '{text}'"));
        }
        text.parse::<f64>()
            .map(StacksChange::Delta)
            .map_err(|_| format!("invalid stacks_change '{text}'"))
    }

    /// Stack count after one decay step.
    #[must_use]
    pub fn apply(self, stacks: u32) -> u32 {
        let next = match self {
            StacksChange::None => return stacks,
            StacksChange::Delta(d) => (f64::from(stacks) + d).floor(),
            StacksChange::Factor(f) => (f64::from(stacks) * f).floor(),
        };
        if next.is_finite() && next > 0.0 {
            next.min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }
}

/// One effect string or several; JSON accepts either form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct TriggerEffects(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for TriggerEffects {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) if s.trim().is_empty() => TriggerEffects(Vec::new()),
            OneOrMany::One(s) => TriggerEffects(vec![s]),
            OneOrMany::Many(v) => TriggerEffects(v),
        }
    }
}

impl From<TriggerEffects> for Vec<String> {
    fn from(value: TriggerEffects) -> Self {
        value.0
    }
}

impl TriggerEffects {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// The built-in lifecycle points of a status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTriggerKind {
    /// Fired once when the status is first applied.
    Apply,
    /// Fired at each of the holder's turn ends, before decay.
    Tick,
    /// Fired just before the status is removed.
    Remove,
    /// Fired when an already-held status is applied again.
    Stack,
    /// Never fired: read by the modifier resolver and stun detection.
    Hold,
}

impl StatusTriggerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StatusTriggerKind::Apply => "apply",
            StatusTriggerKind::Tick => "tick",
            StatusTriggerKind::Remove => "remove",
            StatusTriggerKind::Stack => "stack",
            StatusTriggerKind::Hold => "hold",
        }
    }
}

/// Effect strings per lifecycle point.
///
/// Keys other than the five built-ins are lifecycle event names
/// (`turn_start`, `take_damage`, ...) and fire alongside abilities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTriggers {
    #[serde(default)]
    pub apply: TriggerEffects,
    #[serde(default)]
    pub tick: TriggerEffects,
    #[serde(default)]
    pub remove: TriggerEffects,
    #[serde(default)]
    pub stack: TriggerEffects,
    #[serde(default)]
    pub hold: TriggerEffects,
    #[serde(flatten)]
    pub events: BTreeMap<String, TriggerEffects>,
}

impl StatusTriggers {
    /// Effect strings for a built-in lifecycle point.
    #[must_use]
    pub fn get(&self, kind: StatusTriggerKind) -> &TriggerEffects {
        match kind {
            StatusTriggerKind::Apply => &self.apply,
            StatusTriggerKind::Tick => &self.tick,
            StatusTriggerKind::Remove => &self.remove,
            StatusTriggerKind::Stack => &self.stack,
            StatusTriggerKind::Hold => &self.hold,
        }
    }

    /// Effect strings registered under a lifecycle event name.
    #[must_use]
    pub fn for_event(&self, event: &str) -> Option<&TriggerEffects> {
        self.events.get(event)
    }

    /// Builder: set a built-in trigger.
    #[must_use]
    pub fn with(mut self, kind: StatusTriggerKind, effect: impl Into<String>) -> Self {
        let slot = match kind {
            StatusTriggerKind::Apply => &mut self.apply,
            StatusTriggerKind::Tick => &mut self.tick,
            StatusTriggerKind::Remove => &mut self.remove,
            StatusTriggerKind::Stack => &mut self.stack,
            StatusTriggerKind::Hold => &mut self.hold,
        };
        slot.0.push(effect.into());
        self
    }

    /// Builder: add an effect for a lifecycle event.
    #[must_use]
    pub fn on_event(mut self, event: impl Into<String>, effect: impl Into<String>) -> Self {
        self.events
            .entry(event.into())
            .or_default()
            .0
            .push(effect.into());
        self
    }
}

/// A status effect definition, keyed by `id` in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectDefinition {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub emoji: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "type")]
    pub status_type: StatusType,

    #[serde(default, rename = "stacks_change", alias = "stacksChange")]
    pub stacks_change: StacksChange,

    #[serde(default, rename = "maxStacks", alias = "max_stacks")]
    pub max_stacks: Option<u32>,

    #[serde(default)]
    pub triggers: StatusTriggers,

    #[serde(default)]
    pub source: StatusSource,

    #[serde(default, rename = "createdAt", alias = "created_at")]
    pub created_at: u64,
}

impl StatusEffectDefinition {
    /// Create a definition with no triggers.
    pub fn new(id: impl Into<String>, name: impl Into<String>, status_type: StatusType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            emoji: String::new(),
            description: String::new(),
            status_type,
            stacks_change: StacksChange::None,
            max_stacks: None,
            triggers: StatusTriggers::default(),
            source: StatusSource::System,
            created_at: 0,
        }
    }

    /// Set the decay rule (builder pattern).
    #[must_use]
    pub fn with_stacks_change(mut self, change: StacksChange) -> Self {
        self.stacks_change = change;
        self
    }

    /// Set the stack cap (builder pattern).
    #[must_use]
    pub fn with_max_stacks(mut self, max: u32) -> Self {
        self.max_stacks = Some(max);
        self
    }

    /// Add a built-in trigger effect (builder pattern).
    #[must_use]
    pub fn with_trigger(mut self, kind: StatusTriggerKind, effect: impl Into<String>) -> Self {
        self.triggers = self.triggers.with(kind, effect);
        self
    }

    /// Add a lifecycle-event trigger effect (builder pattern).
    #[must_use]
    pub fn on_event(mut self, event: impl Into<String>, effect: impl Into<String>) -> Self {
        self.triggers = self.triggers.on_event(event, effect);
        self
    }

    /// Set the emoji (builder pattern).
    #[must_use]
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    /// Stack cap, falling back to the configured default.
    #[must_use]
    pub fn stack_cap(&self, default_max: u32) -> u32 {
        self.max_stacks.unwrap_or(default_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacks_change_parse() {
        assert_eq!(StacksChange::parse("x0.5").unwrap(), StacksChange::Factor(0.5));
        assert_eq!(StacksChange::parse("-1").unwrap(), StacksChange::Delta(-1.0));
        assert_eq!(StacksChange::parse("").unwrap(), StacksChange::None);
        assert!(StacksChange::parse("half").is_err());
    }

    #[test]
    fn test_stacks_change_apply() {
        assert_eq!(StacksChange::Delta(-1.0).apply(3), 2);
        assert_eq!(StacksChange::Delta(-5.0).apply(3), 0);
        assert_eq!(StacksChange::Factor(0.5).apply(5), 2);
        assert_eq!(StacksChange::None.apply(5), 5);
    }

    #[test]
    fn test_deserialize_full_definition() {
        let json = r#"{
            "id": "burn",
            "name": "Burn",
            "emoji": "🔥",
            "type": "debuff",
            "stacks_change": -1,
            "maxStacks": 10,
            "triggers": {
                "tick": "ME.hp-stacks",
                "hold": ["ME.damage_taken_modifier+1"],
                "turn_start": "ME.block-1"
            },
            "source": "ai",
            "createdAt": 1700000000
        }"#;
        let def: StatusEffectDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(def.status_type, StatusType::Debuff);
        assert_eq!(def.stacks_change, StacksChange::Delta(-1.0));
        assert_eq!(def.max_stacks, Some(10));
        assert_eq!(def.triggers.tick.0, vec!["ME.hp-stacks".to_string()]);
        assert_eq!(def.triggers.hold.0.len(), 1);
        assert_eq!(
            def.triggers.for_event("turn_start").map(|t| t.0.clone()),
            Some(vec!["ME.block-1".to_string()])
        );
        assert_eq!(def.source, StatusSource::Ai);
    }

    #[test]
    fn test_deserialize_factor_decay() {
        let json = r#"{"id":"charm","name":"Charm","stacks_change":"x0.5"}"#;
        let def: StatusEffectDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.stacks_change, StacksChange::Factor(0.5));
        assert_eq!(def.status_type, StatusType::Neutral);
        assert_eq!(def.stack_cap(999), 999);
    }

    #[test]
    fn test_deserialize_rejects_bad_decay() {
        let json = r#"{"id":"bad","name":"Bad","stacks_change":"sometimes"}"#;
        assert!(serde_json::from_str::<StatusEffectDefinition>(json).is_err());
    }

    #[test]
    fn test_builder() {
        let def = StatusEffectDefinition::new("regen", "Regen", StatusType::Buff)
            .with_trigger(StatusTriggerKind::Tick, "ME.hp+stacks")
            .on_event("take_damage", "ME.block+1")
            .with_max_stacks(5);

        assert_eq!(def.triggers.get(StatusTriggerKind::Tick).0.len(), 1);
        assert!(def.triggers.get(StatusTriggerKind::Apply).is_empty());
        assert!(def.triggers.for_event("take_damage").is_some());
        assert_eq!(def.stack_cap(999), 5);
    }
}
