//! Card system: cards, piles and card selectors.
//!
//! ## Key Types
//!
//! - `Card`: A card instance with its effect string and battle-local uid
//! - `Piles`: The player's hand/draw/discard/exhaust piles
//! - `CardSelector`: Parsed `hand.random[2]+rightmost[1]`-style selection
//! - `CardChooser`: Host hook for `choose[N]` selectors

pub mod card;
pub mod pile;
pub mod selector;

pub use card::{Card, CardType};
pub use pile::{DrawOutcome, Pile, Piles};
pub use selector::{
    select_cards, CardChooser, CardSelector, LeftmostChooser, SelectionInput, SelectorKind,
    SelectorTerm,
};
