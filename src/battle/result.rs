//! Battle result summary and its narrative form.

use serde::{Deserialize, Serialize};

use crate::core::{BattleOutcome, CombatState, Combatant};

/// A held status in a summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub id: String,
    pub name: String,
    pub stacks: u32,
}

/// Final stats of one side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantSummary {
    pub name: String,
    pub current_hp: f64,
    pub max_hp: f64,
    pub current_lust: f64,
    pub max_lust: f64,
    pub block: f64,
    pub statuses: Vec<StatusSummary>,
    /// Wrapped ability texts.
    pub abilities: Vec<String>,
}

impl CombatantSummary {
    #[must_use]
    pub fn of(c: &Combatant) -> Self {
        Self {
            name: c.name.clone(),
            current_hp: c.current_hp,
            max_hp: c.max_hp,
            current_lust: c.current_lust,
            max_lust: c.max_lust,
            block: c.block,
            statuses: c
                .status_effects
                .iter()
                .map(|s| StatusSummary {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    stacks: s.stacks,
                })
                .collect(),
            abilities: c.abilities.iter().map(|a| a.effect.clone()).collect(),
        }
    }

    fn describe(&self) -> String {
        let mut text = format!(
            "{} ended with {}/{} HP and {}/{} lust",
            self.name, self.current_hp, self.max_hp, self.current_lust, self.max_lust
        );
        if !self.statuses.is_empty() {
            let statuses: Vec<String> = self
                .statuses
                .iter()
                .map(|s| format!("{} x{}", s.name, s.stacks))
                .collect();
            text.push_str(&format!(", affected by {}", statuses.join(", ")));
        }
        text.push('.');
        text
    }
}

/// Summary written back to the host when a battle ends (or on demand).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    /// `None` while the battle is still running.
    pub outcome: Option<BattleOutcome>,
    pub turns: u32,
    pub player: CombatantSummary,
    pub enemy: CombatantSummary,
}

impl BattleResult {
    #[must_use]
    pub fn from_state(state: &CombatState) -> Self {
        Self {
            outcome: state.outcome,
            turns: state.turn,
            player: CombatantSummary::of(&state.player.combatant),
            enemy: CombatantSummary::of(&state.enemy.combatant),
        }
    }

    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.outcome == Some(BattleOutcome::Victory)
    }

    /// Free-text summary handed to the host's story generation.
    ///
    /// ```
    /// use card_battle::battle::BattleResult;
    /// use card_battle::core::{BattleOutcome, CombatState, Combatant, Enemy, Player};
    ///
    /// let player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
    /// let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
    /// let mut state = CombatState::new(player, enemy, 1);
    /// state.turn = 3;
    /// state.outcome = Some(BattleOutcome::Victory);
    ///
    /// let text = BattleResult::from_state(&state).narrative();
    /// assert!(text.starts_with("Hero defeated Slime in 3 turns."));
    /// ```
    #[must_use]
    pub fn narrative(&self) -> String {
        let turns = if self.turns == 1 { "1 turn".to_string() } else { format!("{} turns", self.turns) };
        let headline = match self.outcome {
            Some(BattleOutcome::Victory) => {
                format!("{} defeated {} in {turns}.", self.player.name, self.enemy.name)
            }
            Some(BattleOutcome::Defeat) => {
                format!("{} was defeated by {} after {turns}.", self.player.name, self.enemy.name)
            }
            None => format!(
                "{} and {} are still fighting after {turns}.",
                self.player.name, self.enemy.name
            ),
        };
        format!("{headline} {} {}", self.player.describe(), self.enemy.describe())
    }
}
