//! Battle-level services around the effect engine.
//!
//! ## Key Types
//!
//! - `BattleSnapshot`: The host's JSON battle document, in and out
//! - `BattleSession`: Turn flow (start, play card, end turn, enemy turn)
//! - `ActionQueue`: Runs one top-level action at a time
//! - `BattleResult`: Final summary and narrative text

pub mod queue;
pub mod result;
pub mod session;
pub mod snapshot;

pub use queue::{ActionQueue, BattleAction};
pub use result::{BattleResult, CombatantSummary, StatusSummary};
pub use session::{BattleSession, SessionResult};
pub use snapshot::{AbilityEntry, BattleSnapshot, CombatantSnapshot, EnemySnapshot, PlayerSnapshot, StatusEntry};
