//! Turn flow for one battle.
//!
//! A `BattleSession` wraps the effect executor and drives it through the
//! battle: start, player turns (draw, play cards, end turn) and enemy
//! turns. Everything that changes the combat state still goes through
//! effect strings and trigger dispatch.

use tracing::{debug, info, warn};

use super::result::BattleResult;
use super::snapshot::BattleSnapshot;
use crate::cards::{CardChooser, Pile};
use crate::core::{BattleConfig, BattleError, BattleOutcome, CombatState, EffectError, EnemyActionOrder, Side};
use crate::effects::{EffectExecutor, ExecutionContext};
use crate::status::StatusDefinitionStore;
use crate::triggers::{BattleEvent, EventSink, TriggerKind};

/// Consecutive player turns skipped by stun before the player acts anyway.
const MAX_SKIPPED_TURNS: u32 = 100;

pub type SessionResult<T> = std::result::Result<T, BattleError>;

/// One battle between the player and an enemy.
#[derive(Debug)]
pub struct BattleSession {
    exec: EffectExecutor,
    started: bool,
}

impl BattleSession {
    /// Load a battle from a host snapshot.
    #[must_use]
    pub fn new(snapshot: BattleSnapshot, config: BattleConfig) -> Self {
        let (state, store) = snapshot.into_state(&config);
        Self::from_parts(state, store, config)
    }

    /// Build a session around an existing state and status store.
    #[must_use]
    pub fn from_parts(state: CombatState, store: StatusDefinitionStore, config: BattleConfig) -> Self {
        Self {
            exec: EffectExecutor::new(state, store, config),
            started: false,
        }
    }

    /// Replace the event sink (builder pattern).
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.exec = self.exec.with_sink(sink);
        self
    }

    /// Replace the `choose[N]` card chooser (builder pattern).
    #[must_use]
    pub fn with_chooser(mut self, chooser: impl CardChooser + 'static) -> Self {
        self.exec = self.exec.with_chooser(chooser);
        self
    }

    #[must_use]
    pub fn state(&self) -> &CombatState {
        self.exec.state()
    }

    #[must_use]
    pub fn executor(&self) -> &EffectExecutor {
        &self.exec
    }

    pub fn executor_mut(&mut self) -> &mut EffectExecutor {
        &mut self.exec
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.exec.state().is_over()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.exec.state().outcome
    }

    #[must_use]
    pub fn result(&self) -> BattleResult {
        BattleResult::from_state(self.exec.state())
    }

    /// Current state in the host's snapshot format.
    pub fn snapshot(&self) -> SessionResult<BattleSnapshot> {
        self.exec.state().to_snapshot(self.exec.store())
    }

    fn ensure_running(&self) -> SessionResult<()> {
        if self.is_over() {
            Err(BattleError::BattleOver)
        } else {
            Ok(())
        }
    }

    /// Fire `battle_start` for both sides and begin the first player turn.
    pub fn start_battle(&mut self) -> SessionResult<()> {
        self.ensure_running()?;
        if self.started {
            warn!("battle already started");
            return Ok(());
        }
        self.started = true;
        info!(
            player = %self.state().player.combatant.name,
            enemy = %self.state().enemy.combatant.name,
            "battle started"
        );

        for side in Side::BOTH {
            self.exec.fire_trigger(side, TriggerKind::BattleStart);
            if self.is_over() {
                return Ok(());
            }
        }
        self.start_player_turn()
    }

    /// Begin the next player turn.
    ///
    /// A stunned player's turn ends immediately and play passes to the
    /// enemy, until the player can act or the battle ends.
    pub fn start_player_turn(&mut self) -> SessionResult<()> {
        self.ensure_running()?;
        let mut skipped = 0;
        loop {
            let can_act = self.begin_player_turn();
            if self.is_over() || can_act {
                return Ok(());
            }
            skipped += 1;
            if skipped >= MAX_SKIPPED_TURNS {
                warn!(skipped, "player stunned for too many turns; letting the player act");
                return Ok(());
            }
            info!(turn = self.state().turn, "player stunned; turn skipped");
            self.finish_player_turn();
            if self.is_over() {
                return Ok(());
            }
        }
    }

    /// Turn start bookkeeping. Returns whether the player can act.
    fn begin_player_turn(&mut self) -> bool {
        let config = self.exec.config().clone();
        let state = self.exec.state_mut();
        state.turn += 1;
        let draw = if state.turn == 1 {
            config.starting_draw
        } else {
            config.draw_per_turn
        };
        if config.reset_block_each_turn {
            state.player.combatant.block = 0.0;
        }
        state.player.energy = state.player.max_energy;
        debug!(turn = state.turn, draw, "player turn start");

        match self.exec.draw_cards(draw) {
            Ok(_) | Err(EffectError::EmptyPile(_)) => {}
            Err(err) => warn!(error = %err, "turn draw failed"),
        }
        self.exec.process_turn_start(Side::Player);
        !self.exec.is_stunned(Side::Player)
    }

    /// Play a card from hand.
    ///
    /// The cost is paid and the card moved before its effect runs, so the
    /// effect sees the post-payment energy and can target the card in its
    /// new pile via `current`.
    pub fn play_card(&mut self, uid: u32) -> SessionResult<()> {
        self.ensure_running()?;
        if self.exec.is_stunned(Side::Player) {
            return Err(BattleError::Stunned(Side::Player));
        }

        let player = &self.exec.state().player;
        let Some(card) = player.piles.hand.iter().find(|c| c.uid == uid).cloned() else {
            return Err(BattleError::CardNotInHand(uid));
        };
        let energy_before = player.energy;
        if card.cost > energy_before {
            return Err(BattleError::NotEnoughEnergy {
                cost: card.cost,
                available: energy_before,
            });
        }

        let state = self.exec.state_mut();
        state.player.energy = energy_before - card.cost;
        let to = if card.exhaust { Pile::Exhaust } else { Pile::Discard };
        state.player.piles.move_card(uid, to);
        self.exec.emit(BattleEvent::CardsMoved { uids: vec![uid], to });
        info!(uid, card = %card.name, cost = card.cost, "card played");

        let ctx = ExecutionContext::new()
            .with_card(uid)
            .with_energy_before(energy_before);
        self.exec
            .execute_effect_string(&card.effect, true, ctx.clone())?;
        if !self.is_over() {
            self.exec.dispatch(Side::Player, TriggerKind::CardPlayed, &ctx);
        }
        Ok(())
    }

    /// End the player turn, run the enemy turn and start the next player
    /// turn.
    pub fn end_player_turn(&mut self) -> SessionResult<()> {
        self.ensure_running()?;
        self.finish_player_turn();
        if self.is_over() {
            return Ok(());
        }
        self.start_player_turn()
    }

    fn finish_player_turn(&mut self) {
        let discarded = {
            let piles = &mut self.exec.state_mut().player.piles;
            let uids: Vec<u32> = piles.hand.iter().map(|c| c.uid).collect();
            piles.discard_hand();
            uids
        };
        if !discarded.is_empty() {
            self.exec.emit(BattleEvent::CardsMoved {
                uids: discarded,
                to: Pile::Discard,
            });
        }
        self.exec.process_turn_end(Side::Player);
        if !self.is_over() {
            self.enemy_turn();
        }
    }

    fn enemy_turn(&mut self) {
        if self.exec.config().reset_block_each_turn {
            self.exec.state_mut().enemy.combatant.block = 0.0;
        }
        self.exec.process_turn_start(Side::Enemy);
        if self.is_over() {
            return;
        }

        if self.exec.is_stunned(Side::Enemy) {
            info!("enemy stunned; action skipped");
        } else if let Some(action) = self.next_enemy_action() {
            debug!(%action, "enemy acts");
            if let Err(err) = self
                .exec
                .execute_effect_string(&action, false, ExecutionContext::new())
            {
                warn!(%action, error = %err, "enemy action failed");
            }
        }
        if self.is_over() {
            return;
        }
        self.exec.process_turn_end(Side::Enemy);
    }

    /// Pick the enemy's action for this turn.
    fn next_enemy_action(&mut self) -> Option<String> {
        let order = self.exec.config().enemy_action_order;
        let state = self.exec.state_mut();
        let count = state.enemy.actions.len();
        if count == 0 {
            return None;
        }
        let idx = match order {
            EnemyActionOrder::Sequential => {
                let idx = state.enemy.next_action % count;
                state.enemy.next_action = idx + 1;
                idx
            }
            EnemyActionOrder::Random => state.rng.gen_range_usize(0..count),
        };
        state.enemy.actions.get(idx).cloned()
    }

    /// Run an effect string outside a card play (host scripted events).
    pub fn run_effect(&mut self, text: &str, source_is_player: bool) -> SessionResult<()> {
        self.ensure_running()?;
        self.exec
            .execute_effect_string(text, source_is_player, ExecutionContext::new())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use crate::core::{Combatant, Enemy, Player};
    use crate::status::{StacksChange, StatusEffectDefinition, StatusTriggerKind, StatusType};

    fn session(config: BattleConfig) -> BattleSession {
        let mut player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
        for _ in 0..3 {
            player.piles.add(Pile::Draw, Card::new("strike", "Strike", 1.0, "OP.hp-6"));
        }
        player
            .piles
            .add(Pile::Draw, Card::new("burst", "Burst", 2.0, "OP.hp-1").exhausting());
        let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0))
            .with_action("OP.hp-5")
            .with_action("ME.block+3");
        let mut store = StatusDefinitionStore::new();
        store.define(
            StatusEffectDefinition::new("stun", "Stun", StatusType::Debuff)
                .with_trigger(StatusTriggerKind::Hold, "stun")
                .with_stacks_change(StacksChange::Delta(-1.0)),
        );
        BattleSession::from_parts(CombatState::new(player, enemy, 5), store, config)
    }

    #[test]
    fn test_start_draws_and_refills() {
        let mut s = session(BattleConfig::new().with_starting_draw(2));
        s.start_battle().unwrap();
        assert_eq!(s.state().turn, 1);
        assert_eq!(s.state().player.piles.hand.len(), 2);
        assert_eq!(s.state().player.energy, 3.0);
    }

    #[test]
    fn test_play_card_rules() {
        let mut s = session(BattleConfig::new());
        s.start_battle().unwrap();
        let uid = s.state().player.piles.hand[0].uid;

        s.play_card(uid).unwrap();
        assert_eq!(s.state().enemy.combatant.current_hp, 24.0);
        assert_eq!(s.state().player.energy, 2.0);
        assert!(matches!(s.play_card(uid), Err(BattleError::CardNotInHand(_))));

        let burst = s.state().player.piles.hand.iter().find(|c| c.id == "burst").unwrap().uid;
        s.play_card(burst).unwrap();
        assert_eq!(s.state().player.piles.exhaust_pile[0].uid, burst);

        let next = s.state().player.piles.hand[0].uid;
        assert!(matches!(s.play_card(next), Err(BattleError::NotEnoughEnergy { .. })));
    }

    #[test]
    fn test_end_turn_runs_enemy() {
        let mut s = session(BattleConfig::new());
        s.start_battle().unwrap();
        s.end_player_turn().unwrap();

        assert_eq!(s.state().turn, 2);
        assert_eq!(s.state().player.combatant.current_hp, 45.0);
        assert_eq!(s.state().enemy.next_action, 1);
        // turn 2 draws from the reshuffled discard pile
        assert_eq!(s.state().player.piles.hand.len(), 4);
    }

    #[test]
    fn test_stunned_enemy_skips_action() {
        let mut s = session(BattleConfig::new());
        s.start_battle().unwrap();
        s.executor_mut().apply_status(Side::Enemy, "stun", 1).unwrap();
        s.end_player_turn().unwrap();
        assert_eq!(s.state().player.combatant.current_hp, 50.0);
        assert_eq!(s.state().enemy.combatant.stacks_of("stun"), 0);
    }

    #[test]
    fn test_stunned_player_turn_is_skipped() {
        let mut s = session(BattleConfig::new());
        s.start_battle().unwrap();
        s.executor_mut().apply_status(Side::Player, "stun", 2).unwrap();
        assert!(matches!(s.play_card(1), Err(BattleError::Stunned(Side::Player))));

        // turn 2 is skipped, the enemy acts twice
        s.end_player_turn().unwrap();
        assert_eq!(s.state().turn, 3);
        assert_eq!(s.state().enemy.next_action, 2);
        assert_eq!(s.state().player.combatant.current_hp, 45.0);
        assert!(!s.executor().is_stunned(Side::Player));
    }

    #[test]
    fn test_finished_battle_refuses_actions() {
        let mut s = session(BattleConfig::new());
        s.start_battle().unwrap();
        s.run_effect("OP.hp-100", true).unwrap();
        assert_eq!(s.outcome(), Some(BattleOutcome::Victory));
        assert!(matches!(s.end_player_turn(), Err(BattleError::BattleOver)));
        assert!(s.result().narrative().starts_with("Hero defeated Slime"));
    }
}
