//! Structured battle events.
//!
//! The executor never talks to a presentation layer directly. Every
//! observable change is emitted as a [`BattleEvent`] to an injected
//! [`EventSink`]; UI, animation, battle logs and tests subscribe there.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cards::Pile;
use crate::core::Side;

/// Something observable that happened during a battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BattleEvent {
    /// A numeric attribute changed (after clamping and rounding).
    AttributeChanged {
        side: Side,
        attribute: String,
        before: f64,
        after: f64,
    },
    /// HP was lost. `blocked` is the part absorbed by block.
    Damaged { side: Side, amount: f64, blocked: f64 },
    Healed { side: Side, amount: f64 },
    StatusApplied { side: Side, status: String, stacks: u32 },
    StatusStacksChanged {
        side: Side,
        status: String,
        before: u32,
        after: u32,
    },
    StatusRemoved { side: Side, status: String },
    AbilityAdded { side: Side, ability: String },
    AbilityTriggered {
        side: Side,
        trigger: String,
        effect: String,
    },
    /// `side` reached max lust; its opponent's overflow effect ran.
    LustOverflow { side: Side },
    CardsMoved { uids: Vec<u32>, to: Pile },
    /// A unit was skipped because it failed to parse or resolve.
    /// `origin` names the ability, status, relic or card that ran it.
    EffectSkipped {
        raw: String,
        reason: String,
        origin: Option<String>,
    },
    GameOver { winner: Side },
}

impl BattleEvent {
    /// The side this event concerns, if any.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match self {
            BattleEvent::AttributeChanged { side, .. }
            | BattleEvent::Damaged { side, .. }
            | BattleEvent::Healed { side, .. }
            | BattleEvent::StatusApplied { side, .. }
            | BattleEvent::StatusStacksChanged { side, .. }
            | BattleEvent::StatusRemoved { side, .. }
            | BattleEvent::AbilityAdded { side, .. }
            | BattleEvent::AbilityTriggered { side, .. }
            | BattleEvent::LustOverflow { side } => Some(*side),
            BattleEvent::GameOver { winner } => Some(*winner),
            BattleEvent::CardsMoved { .. } | BattleEvent::EffectSkipped { .. } => None,
        }
    }
}

/// Receiver for battle events.
pub trait EventSink {
    fn emit(&mut self, event: &BattleEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &BattleEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &BattleEvent) {
        match event {
            BattleEvent::GameOver { winner } => info!(%winner, "game over"),
            BattleEvent::LustOverflow { side } => info!(%side, "lust overflow"),
            other => debug!(event = ?other, "battle event"),
        }
    }
}

/// Collects events in memory.
///
/// Clones share the same buffer, so a handle kept by the caller sees
/// everything emitted to the copy handed to the executor.
///
/// ```
/// use card_battle::core::Side;
/// use card_battle::triggers::{BattleEvent, EventLog, EventSink};
///
/// let log = EventLog::new();
/// let mut sink = log.clone();
/// sink.emit(&BattleEvent::LustOverflow { side: Side::Enemy });
/// assert_eq!(log.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<BattleEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<BattleEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return every event so far.
    pub fn drain(&self) -> Vec<BattleEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Count events matching a predicate.
    pub fn count(&self, pred: impl Fn(&BattleEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    /// Names of triggers that fired, in order.
    #[must_use]
    pub fn triggered(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BattleEvent::AbilityTriggered { trigger, .. } => Some(trigger.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &BattleEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_shares_buffer() {
        let log = EventLog::new();
        let mut handle = log.clone();
        handle.emit(&BattleEvent::Healed {
            side: Side::Player,
            amount: 3.0,
        });
        handle.emit(&BattleEvent::GameOver {
            winner: Side::Player,
        });

        assert_eq!(log.len(), 2);
        assert_eq!(
            log.count(|e| matches!(e, BattleEvent::GameOver { .. })),
            1
        );
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_side() {
        let e = BattleEvent::StatusRemoved {
            side: Side::Enemy,
            status: "burn".into(),
        };
        assert_eq!(e.side(), Some(Side::Enemy));

        let e = BattleEvent::CardsMoved {
            uids: vec![1],
            to: Pile::Discard,
        };
        assert_eq!(e.side(), None);
    }

    #[test]
    fn test_event_serializes_tagged() {
        let e = BattleEvent::LustOverflow { side: Side::Enemy };
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"event":"lust_overflow","side":"enemy"}"#);
    }

    #[test]
    fn test_triggered_names() {
        let log = EventLog::new();
        let mut handle = log.clone();
        handle.emit(&BattleEvent::AbilityTriggered {
            side: Side::Player,
            trigger: "lose_block".into(),
            effect: "ME.hp+1".into(),
        });
        assert_eq!(log.triggered(), vec!["lose_block".to_string()]);
    }
}
