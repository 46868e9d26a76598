//! Variable lookup and substitution.
//!
//! Effect values and conditions reference live combat state by name:
//! bare identifiers (`max_hp`), prefixed paths (`ME.block`, `OP.hand_size`)
//! and stack indirection (`ME.stacks.burn`, `OP.stacks.debuffs`).
//! Substitution runs in three passes, stacks paths first, then `ME.`/`OP.`
//! paths, then bare identifiers, so a later pass never sees text an earlier
//! pass produced as a name.

use std::borrow::Cow;

use tracing::trace;

use super::attributes::is_modifier;
use super::eval::{evaluate_arithmetic, evaluate_condition};
use super::modifiers::{resolve_modifier, ModifierType};
use crate::cards::Pile;
use crate::core::{CombatState, Side};
use crate::status::StatusDefinitionStore;

/// Variables that only exist on the player; they read 0 on the enemy.
const PLAYER_ONLY_VARIABLES: [&str; 9] = [
    "energy",
    "max_energy",
    "hand_size",
    "draw_pile_size",
    "deck_size",
    "discard_pile_size",
    "discard_size",
    "exhaust_pile_size",
    "energy_before_card_play",
];

/// Format a number for substitution into evaluator input.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Rewrite every dotted identifier path in `text`.
///
/// A path is a maximal run of `[A-Za-z0-9_.]` that starts with a letter or
/// `_`. Runs starting with a digit (numbers) are left alone. `rewrite`
/// returns `None` to keep a path unchanged.
pub fn map_paths<'a, F>(text: &'a str, mut rewrite: F) -> Cow<'a, str>
where
    F: FnMut(&str) -> Option<String>,
{
    let is_path_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
    let mut out: Option<String> = None;
    let mut last = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((start, c)) = iter.next() {
        if !is_path_char(c) {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = iter.peek() {
            if !is_path_char(next) {
                break;
            }
            end = i + next.len_utf8();
            iter.next();
        }
        if !(c.is_ascii_alphabetic() || c == '_') {
            continue;
        }
        if let Some(replacement) = rewrite(&text[start..end]) {
            let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
            buf.push_str(&text[last..start]);
            buf.push_str(&replacement);
            last = end;
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[last..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(text),
    }
}

/// Read-only view of combat state for variable resolution.
///
/// `me` is the invoking side (what `ME.` means); `bare` is the side bare
/// identifiers read from, which is the unit's resolved target.
#[derive(Clone, Copy)]
pub struct VariableScope<'a> {
    pub state: &'a CombatState,
    pub store: &'a StatusDefinitionStore,
    pub me: Side,
    pub bare: Side,
    pub energy_before_card_play: Option<f64>,
}

impl<'a> VariableScope<'a> {
    /// Scope where bare identifiers read the invoking side.
    #[must_use]
    pub fn new(state: &'a CombatState, store: &'a StatusDefinitionStore, me: Side) -> Self {
        Self {
            state,
            store,
            me,
            bare: me,
            energy_before_card_play: None,
        }
    }

    /// Read bare identifiers from another side (builder pattern).
    #[must_use]
    pub fn reading(mut self, bare: Side) -> Self {
        self.bare = bare;
        self
    }

    /// Expose the pre-play energy (builder pattern).
    #[must_use]
    pub fn with_energy_before(mut self, energy: Option<f64>) -> Self {
        self.energy_before_card_play = energy;
        self
    }

    /// Value of a named variable on one side.
    #[must_use]
    pub fn lookup(&self, side: Side, name: &str) -> Option<f64> {
        if side == Side::Enemy && PLAYER_ONLY_VARIABLES.contains(&name) {
            return Some(0.0);
        }
        let state = self.state;
        let c = state.combatant(side);
        let piles = &state.player.piles;
        let value = match name {
            "hp" | "current_hp" => c.current_hp,
            "max_hp" => c.max_hp,
            "lust" | "current_lust" => c.current_lust,
            "max_lust" => c.max_lust,
            "block" => c.block,
            "energy" => state.player.energy,
            "max_energy" => state.player.max_energy,
            "hand_size" => piles.len(Pile::Hand) as f64,
            "draw_pile_size" | "deck_size" => piles.len(Pile::Draw) as f64,
            "discard_pile_size" | "discard_size" => piles.len(Pile::Discard) as f64,
            "exhaust_pile_size" => piles.len(Pile::Exhaust) as f64,
            "energy_before_card_play" => self.energy_before_card_play.unwrap_or(state.player.energy),
            "turn" => f64::from(state.turn),
            "status_count" => c.status_effects.len() as f64,
            modifier if is_modifier(modifier) => {
                let ty = ModifierType::from_name(modifier)?;
                resolve_modifier(state, self.store, side, ty).add
            }
            _ => return None,
        };
        Some(value)
    }

    /// Stack count on one side: a status id, `buffs`, `debuffs` or
    /// `all_buffs` (every held status).
    #[must_use]
    pub fn stacks(&self, side: Side, key: &str) -> f64 {
        let statuses = &self.state.combatant(side).status_effects;
        let total: u32 = match key {
            "buffs" => statuses.iter().filter(|s| s.is_buff()).map(|s| s.stacks).sum(),
            "debuffs" => statuses.iter().filter(|s| s.is_debuff()).map(|s| s.stacks).sum(),
            "all_buffs" => statuses.iter().map(|s| s.stacks).sum(),
            id => statuses.iter().filter(|s| s.id == id).map(|s| s.stacks).sum(),
        };
        f64::from(total)
    }

    fn stacks_path(&self, path: &str) -> Option<f64> {
        let mut parts = path.split('.');
        let (prefix, middle, key) = (parts.next()?, parts.next()?, parts.next()?);
        if middle != "stacks" || parts.next().is_some() {
            return None;
        }
        match prefix {
            "ME" => Some(self.stacks(self.me, key)),
            "OP" => Some(self.stacks(self.me.opponent(), key)),
            "ALL" => Some(self.stacks(Side::Player, key) + self.stacks(Side::Enemy, key)),
            _ => None,
        }
    }

    fn prefixed_path(&self, path: &str) -> Option<f64> {
        let (prefix, name) = path.split_once('.')?;
        let side = match prefix {
            "ME" => self.me,
            "OP" => self.me.opponent(),
            _ => return None,
        };
        self.lookup(side, name)
    }

    /// Resolve a single variable path.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<f64> {
        if path.contains('.') {
            self.stacks_path(path).or_else(|| self.prefixed_path(path))
        } else {
            self.lookup(self.bare, path)
        }
    }

    /// Substitute every known variable in `text` by its value.
    ///
    /// Unknown names are left in place so the evaluator whitelist rejects
    /// them.
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        let pass1 = map_paths(text, |path| self.stacks_path(path).map(format_number));
        let pass2 = map_paths(&pass1, |path| self.prefixed_path(path).map(format_number));
        let pass3 = map_paths(&pass2, |path| {
            if path.contains('.') {
                return None;
            }
            self.lookup(self.bare, path).map(format_number)
        });
        trace!(from = text, to = %pass3, "substituted variables");
        pass3.into_owned()
    }

    /// Substitute then evaluate arithmetic (floored; 0 on failure).
    #[must_use]
    pub fn evaluate(&self, text: &str) -> f64 {
        evaluate_arithmetic(&self.substitute(text))
    }

    /// Substitute then evaluate a condition (`false` on failure).
    #[must_use]
    pub fn condition(&self, text: &str) -> bool {
        evaluate_condition(&self.substitute(text))
    }
}
