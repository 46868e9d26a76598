//! Single-flight action queue.
//!
//! At most one top-level battle action runs at a time. Actions pushed while
//! the queue is draining (for example by an event sink reacting to a card
//! play) wait their turn; a second drain started from inside the first is
//! refused with [`BattleError::Busy`].

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::session::{BattleSession, SessionResult};
use crate::core::BattleError;

/// A top-level battle action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BattleAction {
    PlayCard { uid: u32 },
    EndTurn,
    Effect { text: String, source_is_player: bool },
}

/// Marks the queue busy for as long as it lives.
struct DrainGuard(Rc<Cell<bool>>);

impl DrainGuard {
    fn acquire(flag: &Rc<Cell<bool>>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(Rc::clone(flag)))
        }
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Queue of pending actions for one session.
///
/// Clones are handles to the same queue.
///
/// ```
/// use card_battle::battle::{ActionQueue, BattleAction, BattleSession};
/// use card_battle::core::{BattleConfig, CombatState, Combatant, Enemy, Player};
/// use card_battle::status::StatusDefinitionStore;
///
/// let player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
/// let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
/// let session = BattleSession::from_parts(
///     CombatState::new(player, enemy, 1),
///     StatusDefinitionStore::new(),
///     BattleConfig::new(),
/// );
///
/// let queue = ActionQueue::new(session);
/// queue.push(BattleAction::Effect { text: "OP.hp-4".into(), source_is_player: true });
/// assert_eq!(queue.drain().unwrap(), 1);
/// assert_eq!(queue.session().state().enemy.combatant.current_hp, 26.0);
/// ```
#[derive(Clone)]
pub struct ActionQueue {
    session: Rc<RefCell<BattleSession>>,
    pending: Rc<RefCell<VecDeque<BattleAction>>>,
    busy: Rc<Cell<bool>>,
}

impl std::fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionQueue")
            .field("pending", &self.pending.borrow().len())
            .field("busy", &self.busy.get())
            .finish_non_exhaustive()
    }
}

impl ActionQueue {
    #[must_use]
    pub fn new(session: BattleSession) -> Self {
        Self {
            session: Rc::new(RefCell::new(session)),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            busy: Rc::new(Cell::new(false)),
        }
    }

    /// Enqueue an action. Allowed while draining.
    pub fn push(&self, action: BattleAction) {
        debug!(?action, "action queued");
        self.pending.borrow_mut().push_back(action);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Borrow the session between drains.
    ///
    /// # Panics
    ///
    /// Panics if called while an action is running.
    #[must_use]
    pub fn session(&self) -> Ref<'_, BattleSession> {
        self.session.borrow()
    }

    /// Run queued actions in order until the queue is empty.
    ///
    /// Stops at the first failing action and returns its error; actions
    /// behind it stay queued. Returns how many actions ran.
    pub fn drain(&self) -> SessionResult<usize> {
        let Some(_guard) = DrainGuard::acquire(&self.busy) else {
            warn!("drain requested while another action is running");
            return Err(BattleError::Busy);
        };

        let mut ran = 0;
        loop {
            let Some(action) = self.pending.borrow_mut().pop_front() else {
                return Ok(ran);
            };
            let mut session = self.session.borrow_mut();
            run_action(&mut session, &action)?;
            ran += 1;
        }
    }
}

fn run_action(session: &mut BattleSession, action: &BattleAction) -> SessionResult<()> {
    debug!(?action, "running action");
    match action {
        BattleAction::PlayCard { uid } => session.play_card(*uid),
        BattleAction::EndTurn => session.end_player_turn(),
        BattleAction::Effect {
            text,
            source_is_player,
        } => session.run_effect(text, *source_is_player),
    }
}
