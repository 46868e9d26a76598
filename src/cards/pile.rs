//! The player's card piles and movement between them.
//!
//! `Piles` tracks where every card is and moves cards between piles.
//! Pile order is significant: index 0 is the top of the draw pile and the
//! leftmost card of the hand.

use serde::{Deserialize, Serialize};

use super::card::Card;
use crate::core::rng::GameRng;

/// One of the player's card piles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pile {
    Hand,
    Draw,
    Discard,
    Exhaust,
}

impl Pile {
    /// All piles in search order.
    pub const ALL: [Pile; 4] = [Pile::Hand, Pile::Draw, Pile::Discard, Pile::Exhaust];

    /// Parse a selector domain prefix (`hand`, `draw`, `discard`, `exhaust`).
    #[must_use]
    pub fn from_domain(name: &str) -> Option<Self> {
        match name {
            "hand" => Some(Pile::Hand),
            "draw" => Some(Pile::Draw),
            "discard" => Some(Pile::Discard),
            "exhaust" => Some(Pile::Exhaust),
            _ => None,
        }
    }
}

impl std::fmt::Display for Pile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pile::Hand => write!(f, "hand"),
            Pile::Draw => write!(f, "draw"),
            Pile::Discard => write!(f, "discard"),
            Pile::Exhaust => write!(f, "exhaust"),
        }
    }
}

/// Result of a single draw attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Card moved to hand.
    Drawn(u32),
    /// Hand was full; the card went to the discard pile.
    Burned(u32),
    /// Draw and discard piles were both empty.
    Empty,
}

/// The player's hand, draw, discard and exhaust piles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Piles {
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub draw_pile: Vec<Card>,
    #[serde(default)]
    pub discard_pile: Vec<Card>,
    #[serde(default)]
    pub exhaust_pile: Vec<Card>,
    #[serde(default)]
    next_uid: u32,
}

impl Piles {
    /// Create empty piles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every card without a uid a fresh one.
    ///
    /// Called when a snapshot is loaded; uids already present are kept.
    pub fn assign_uids(&mut self) {
        let highest = Pile::ALL
            .iter()
            .flat_map(|&p| self.get(p).iter().map(|c| c.uid))
            .max()
            .unwrap_or(0);
        self.next_uid = self.next_uid.max(highest);

        for pile in Pile::ALL {
            let mut next = self.next_uid;
            for card in self.get_mut(pile).iter_mut().filter(|c| c.uid == 0) {
                next += 1;
                card.uid = next;
            }
            self.next_uid = next;
        }
    }

    /// Add a card to the end of a pile, assigning a uid if needed.
    pub fn add(&mut self, pile: Pile, mut card: Card) -> u32 {
        if card.uid == 0 {
            self.next_uid += 1;
            card.uid = self.next_uid;
        }
        let uid = card.uid;
        self.get_mut(pile).push(card);
        uid
    }

    #[must_use]
    pub fn get(&self, pile: Pile) -> &Vec<Card> {
        match pile {
            Pile::Hand => &self.hand,
            Pile::Draw => &self.draw_pile,
            Pile::Discard => &self.discard_pile,
            Pile::Exhaust => &self.exhaust_pile,
        }
    }

    pub fn get_mut(&mut self, pile: Pile) -> &mut Vec<Card> {
        match pile {
            Pile::Hand => &mut self.hand,
            Pile::Draw => &mut self.draw_pile,
            Pile::Discard => &mut self.discard_pile,
            Pile::Exhaust => &mut self.exhaust_pile,
        }
    }

    /// Number of cards in a pile.
    #[must_use]
    pub fn len(&self, pile: Pile) -> usize {
        self.get(pile).len()
    }

    /// Locate a card by uid.
    #[must_use]
    pub fn find(&self, uid: u32) -> Option<(Pile, usize)> {
        Pile::ALL.into_iter().find_map(|pile| {
            self.get(pile)
                .iter()
                .position(|c| c.uid == uid)
                .map(|idx| (pile, idx))
        })
    }

    /// Borrow a card by uid.
    #[must_use]
    pub fn card(&self, uid: u32) -> Option<&Card> {
        self.find(uid).map(|(pile, idx)| &self.get(pile)[idx])
    }

    /// Mutably borrow a card by uid.
    pub fn card_mut(&mut self, uid: u32) -> Option<&mut Card> {
        let (pile, idx) = self.find(uid)?;
        Some(&mut self.get_mut(pile)[idx])
    }

    /// Remove a card from whichever pile holds it.
    pub fn take(&mut self, uid: u32) -> Option<Card> {
        let (pile, idx) = self.find(uid)?;
        Some(self.get_mut(pile).remove(idx))
    }

    /// Move a card to the end of another pile.
    ///
    /// Returns the pile it came from, or `None` if the uid is unknown.
    pub fn move_card(&mut self, uid: u32, to: Pile) -> Option<Pile> {
        let (from, idx) = self.find(uid)?;
        let card = self.get_mut(from).remove(idx);
        self.get_mut(to).push(card);
        Some(from)
    }

    /// Shuffle the discard pile back into the draw pile.
    pub fn reshuffle_discard(&mut self, rng: &mut GameRng) {
        let mut cards = std::mem::take(&mut self.discard_pile);
        rng.shuffle(&mut cards);
        self.draw_pile.extend(cards);
    }

    /// Draw the top card, reshuffling the discard pile if the draw pile is empty.
    pub fn draw_one(&mut self, hand_limit: usize, rng: &mut GameRng) -> DrawOutcome {
        if self.draw_pile.is_empty() {
            self.reshuffle_discard(rng);
        }
        if self.draw_pile.is_empty() {
            return DrawOutcome::Empty;
        }

        let card = self.draw_pile.remove(0);
        let uid = card.uid;
        if self.hand.len() >= hand_limit {
            self.discard_pile.push(card);
            DrawOutcome::Burned(uid)
        } else {
            self.hand.push(card);
            DrawOutcome::Drawn(uid)
        }
    }

    /// Move the whole hand to the discard pile.
    pub fn discard_hand(&mut self) -> usize {
        let cards = std::mem::take(&mut self.hand);
        let count = cards.len();
        self.discard_pile.extend(cards);
        count
    }
}
