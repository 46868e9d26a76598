//! Cards as they exist inside a battle.
//!
//! A card is authored data (name, cost, effect string) plus a battle-local
//! `uid` that distinguishes copies of the same card across piles.

use serde::{Deserialize, Serialize};

/// Broad card category, used for display and by the host's card pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    #[default]
    Attack,
    Skill,
    Power,
    Curse,
    Status,
}

/// A card instance in one of the player's piles.
///
/// ## Example
///
/// ```
/// use card_battle::cards::{Card, CardType};
///
/// let strike = Card::new("strike", "Strike", 1.0, "OP.hp-6").with_type(CardType::Attack);
/// assert_eq!(strike.effect, "OP.hp-6");
/// assert_eq!(strike.uid, 0); // assigned when the card enters a battle
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Battle-local instance id (0 = not yet assigned).
    #[serde(default)]
    pub uid: u32,

    /// Authored card id; copies share it.
    pub id: String,

    pub name: String,

    /// Energy cost.
    #[serde(default)]
    pub cost: f64,

    /// Effect string executed when the card is played.
    #[serde(default)]
    pub effect: String,

    #[serde(default, rename = "type", alias = "card_type")]
    pub card_type: CardType,

    /// Played cards go to the exhaust pile instead of discard.
    #[serde(default)]
    pub exhaust: bool,

    #[serde(default)]
    pub description: String,
}

impl Card {
    /// Create a card with no uid assigned.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cost: f64,
        effect: impl Into<String>,
    ) -> Self {
        Self {
            uid: 0,
            id: id.into(),
            name: name.into(),
            cost,
            effect: effect.into(),
            card_type: CardType::default(),
            exhaust: false,
            description: String::new(),
        }
    }

    /// Set the card type (builder pattern).
    #[must_use]
    pub fn with_type(mut self, card_type: CardType) -> Self {
        self.card_type = card_type;
        self
    }

    /// Mark the card as exhausting (builder pattern).
    #[must_use]
    pub fn exhausting(mut self) -> Self {
        self.exhaust = true;
        self
    }

    /// Set the description (builder pattern).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let card = Card::new("guard", "Guard", 1.0, "ME.block+5")
            .with_type(CardType::Skill)
            .exhausting()
            .with_description("Gain 5 block");

        assert_eq!(card.card_type, CardType::Skill);
        assert!(card.exhaust);
        assert_eq!(card.description, "Gain 5 block");
    }

    #[test]
    fn test_deserialize_minimal() {
        let card: Card = serde_json::from_str(r#"{"id":"x","name":"X"}"#).unwrap();
        assert_eq!(card.cost, 0.0);
        assert_eq!(card.effect, "");
        assert_eq!(card.card_type, CardType::Attack);
    }

    #[test]
    fn test_deserialize_type_field() {
        let card: Card =
            serde_json::from_str(r#"{"id":"p","name":"P","type":"power","cost":2}"#).unwrap();
        assert_eq!(card.card_type, CardType::Power);
        assert_eq!(card.cost, 2.0);
    }
}
