//! Battle sides and per-side data storage.
//!
//! ## Side
//!
//! A battle always has exactly two participants: the player and the enemy.
//! Effect strings address them relatively (`ME`/`OP`); `Side` is the
//! absolute form those tokens resolve to.
//!
//! ## SideMap
//!
//! Per-side storage with O(1) indexing by `Side`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// One of the two battle participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    /// Both sides, player first.
    pub const BOTH: [Side; 2] = [Side::Player, Side::Enemy];

    /// Side for a `source_is_player` flag.
    #[must_use]
    pub const fn from_is_player(is_player: bool) -> Self {
        if is_player {
            Side::Player
        } else {
            Side::Enemy
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    #[must_use]
    pub const fn is_player(self) -> bool {
        matches!(self, Side::Player)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::Player => 0,
            Side::Enemy => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Player => write!(f, "player"),
            Side::Enemy => write!(f, "enemy"),
        }
    }
}

/// Per-side data storage with O(1) access.
///
/// ```
/// use card_battle::core::{Side, SideMap};
///
/// let mut dead: SideMap<bool> = SideMap::default();
/// dead[Side::Enemy] = true;
/// assert!(!dead[Side::Player]);
/// assert!(dead.get(Side::Enemy));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideMap<T> {
    data: [T; 2],
}

impl<T> SideMap<T> {
    /// Create a map from explicit player and enemy values.
    pub fn new(player: T, enemy: T) -> Self {
        Self {
            data: [player, enemy],
        }
    }

    /// Iterate over (Side, &T) pairs, player first.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::BOTH.into_iter().zip(self.data.iter())
    }
}

impl<T: Copy> SideMap<T> {
    /// Copy out one side's value.
    #[must_use]
    pub fn get(&self, side: Side) -> T {
        self.data[side.index()]
    }
}

impl<T: Default> SideMap<T> {
    /// Reset both entries to their default.
    pub fn clear(&mut self) {
        self.data = [T::default(), T::default()];
    }
}

impl<T> Index<Side> for SideMap<T> {
    type Output = T;

    fn index(&self, side: Side) -> &Self::Output {
        &self.data[side.index()]
    }
}

impl<T> IndexMut<Side> for SideMap<T> {
    fn index_mut(&mut self, side: Side) -> &mut Self::Output {
        &mut self.data[side.index()]
    }
}
