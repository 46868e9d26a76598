//! Battle configuration.
//!
//! Hosts configure the engine at battle setup by providing a `BattleConfig`,
//! either built in code or loaded from the host's JSON variable store.
//! Every field has a default, so partial JSON documents are accepted.

use serde::{Deserialize, Serialize};

/// How the enemy picks its next action from its action list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyActionOrder {
    /// Cycle through the actions in authored order.
    #[default]
    Sequential,
    /// Pick uniformly at random each turn.
    Random,
}

/// Complete battle configuration.
///
/// ```
/// use card_battle::core::BattleConfig;
///
/// let config = BattleConfig::from_json(r#"{"seed": 7, "draw_per_turn": 4}"#).unwrap();
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.draw_per_turn, 4);
/// assert_eq!(config.hand_limit, 10);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// RNG seed for selectors, reshuffles and enemy choice.
    pub seed: u64,

    /// Cards drawn at the start of every player turn after the first.
    pub draw_per_turn: usize,

    /// Cards drawn at the start of the first player turn.
    pub starting_draw: usize,

    /// Maximum hand size; overflow draws go to the discard pile.
    pub hand_limit: usize,

    /// Stack cap for status definitions that declare no `maxStacks`.
    pub default_max_stacks: u32,

    /// Maximum nesting of re-entrant effect executions.
    pub max_nesting_depth: u32,

    /// Clear block at the start of each side's turn.
    pub reset_block_each_turn: bool,

    /// Enemy action selection rule.
    pub enemy_action_order: EnemyActionOrder,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            draw_per_turn: 5,
            starting_draw: 5,
            hand_limit: 10,
            default_max_stacks: 999,
            max_nesting_depth: 32,
            reset_block_each_turn: true,
            enemy_action_order: EnemyActionOrder::Sequential,
        }
    }
}

impl BattleConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the per-turn draw count.
    #[must_use]
    pub fn with_draw_per_turn(mut self, count: usize) -> Self {
        self.draw_per_turn = count;
        self
    }

    /// Set the first-turn draw count.
    #[must_use]
    pub fn with_starting_draw(mut self, count: usize) -> Self {
        self.starting_draw = count;
        self
    }

    /// Set the maximum hand size.
    #[must_use]
    pub fn with_hand_limit(mut self, limit: usize) -> Self {
        self.hand_limit = limit;
        self
    }

    /// Set the default status stack cap.
    #[must_use]
    pub fn with_default_max_stacks(mut self, max: u32) -> Self {
        self.default_max_stacks = max;
        self
    }

    /// Set the nesting limit for re-entrant effects.
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: u32) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Keep block across turns.
    #[must_use]
    pub fn keep_block(mut self) -> Self {
        self.reset_block_each_turn = false;
        self
    }

    /// Set the enemy action selection rule.
    #[must_use]
    pub fn with_enemy_action_order(mut self, order: EnemyActionOrder) -> Self {
        self.enemy_action_order = order;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BattleConfig::new();
        assert_eq!(config.default_max_stacks, 999);
        assert_eq!(config.max_nesting_depth, 32);
        assert!(config.reset_block_each_turn);
        assert_eq!(config.enemy_action_order, EnemyActionOrder::Sequential);
    }

    #[test]
    fn test_builder() {
        let config = BattleConfig::new()
            .with_seed(3)
            .with_hand_limit(8)
            .keep_block()
            .with_enemy_action_order(EnemyActionOrder::Random);

        assert_eq!(config.seed, 3);
        assert_eq!(config.hand_limit, 8);
        assert!(!config.reset_block_each_turn);
        assert_eq!(config.enemy_action_order, EnemyActionOrder::Random);
    }

    #[test]
    fn test_from_json_partial() {
        let config = BattleConfig::from_json(r#"{"enemy_action_order": "random"}"#).unwrap();
        assert_eq!(config.enemy_action_order, EnemyActionOrder::Random);
        assert_eq!(config.draw_per_turn, 5);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(BattleConfig::from_json("{not json").is_err());
    }
}
