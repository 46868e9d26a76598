//! Card-domain effects: draw, discard, exhaust and cost.
//!
//! These always act on the player's piles, whoever invokes them.

use tracing::debug;

use super::context::ExecutionContext;
use super::executor::EffectExecutor;
use super::expression::{EffectExpression, Operator};
use super::Result;
use crate::cards::{select_cards, CardSelector, DrawOutcome, Pile, SelectionInput};
use crate::core::{round1, EffectError, Side};
use crate::triggers::event::BattleEvent;

impl EffectExecutor {
    pub(crate) fn execute_card_unit(
        &mut self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        match unit.attribute.as_str() {
            "draw" => match &unit.selector {
                Some(selector) => {
                    let uids = self.select(selector, Pile::Draw, ctx);
                    self.draw_selected(&uids);
                    Ok(())
                }
                None => {
                    let count = self.card_count(unit, me, ctx)?;
                    self.draw_cards(count).map(|_| ())
                }
            },
            "discard" => self.move_selected(unit, me, ctx, Pile::Discard),
            "exhaust" => self.move_selected(unit, me, ctx, Pile::Exhaust),
            "cost" => self.change_cost(unit, me, ctx),
            other => Err(EffectError::UnknownAttribute(other.to_string())),
        }
    }

    /// `+N` count of a card unit without a selector.
    fn card_count(&self, unit: &EffectExpression, me: Side, ctx: &ExecutionContext) -> Result<usize> {
        if unit.operator != Some(Operator::Increase) {
            return Err(EffectError::UnsupportedOperator {
                attribute: unit.attribute.clone(),
                op: unit.operator.map_or_else(String::new, |op| op.to_string()),
            });
        }
        let value = self.resolve_value(unit, me, Side::Player, ctx)?;
        Ok(value.floor().max(0.0) as usize)
    }

    fn select(&mut self, selector: &CardSelector, default_domain: Pile, ctx: &ExecutionContext) -> Vec<u32> {
        let Self { state, chooser, .. } = self;
        select_cards(
            selector,
            SelectionInput {
                piles: &state.player.piles,
                default_domain,
                current: ctx.card_context,
                rng: &mut state.rng,
                chooser: &mut **chooser,
            },
        )
    }

    /// Draw `count` cards from the draw pile, reshuffling the discard pile
    /// when it runs out. Returns the number that reached the hand.
    pub fn draw_cards(&mut self, count: usize) -> Result<usize> {
        let limit = self.config.hand_limit;
        let mut drawn = Vec::new();
        let mut burned = Vec::new();

        for _ in 0..count {
            let state = &mut self.state;
            match state.player.piles.draw_one(limit, &mut state.rng) {
                DrawOutcome::Drawn(uid) => drawn.push(uid),
                DrawOutcome::Burned(uid) => burned.push(uid),
                DrawOutcome::Empty => break,
            }
        }
        debug!(requested = count, drawn = drawn.len(), burned = burned.len(), "cards drawn");

        if count > 0 && drawn.is_empty() && burned.is_empty() {
            return Err(EffectError::EmptyPile(Pile::Draw));
        }
        let reached_hand = drawn.len();
        self.cards_moved(drawn, Pile::Hand);
        self.cards_moved(burned, Pile::Discard);
        Ok(reached_hand)
    }

    /// Move selected cards to hand; past the hand limit they are discarded.
    fn draw_selected(&mut self, uids: &[u32]) {
        let limit = self.config.hand_limit;
        let piles = &mut self.state.player.piles;
        let mut to_hand = Vec::new();
        let mut burned = Vec::new();

        for &uid in uids {
            if piles.len(Pile::Hand) < limit {
                piles.move_card(uid, Pile::Hand);
                to_hand.push(uid);
            } else {
                piles.move_card(uid, Pile::Discard);
                burned.push(uid);
            }
        }
        self.cards_moved(to_hand, Pile::Hand);
        self.cards_moved(burned, Pile::Discard);
    }

    /// `discard`/`exhaust`: a selector (default domain hand) or `+N`,
    /// which means `hand.random[N]`.
    fn move_selected(&mut self, unit: &EffectExpression, me: Side, ctx: &ExecutionContext, to: Pile) -> Result<()> {
        let selector = match &unit.selector {
            Some(selector) => selector.clone(),
            None => CardSelector::random(Pile::Hand, self.card_count(unit, me, ctx)?),
        };
        let uids = self.select(&selector, Pile::Hand, ctx);
        let piles = &mut self.state.player.piles;
        let moved: Vec<u32> = uids
            .into_iter()
            .filter(|&uid| piles.move_card(uid, to).is_some())
            .collect();
        self.cards_moved(moved, to);
        Ok(())
    }

    /// `cost.<selector> op V`, default selector `hand.all`, floored at 0.
    fn change_cost(&mut self, unit: &EffectExpression, me: Side, ctx: &ExecutionContext) -> Result<()> {
        let op = unit
            .operator
            .filter(|op| op.is_arithmetic())
            .ok_or_else(|| EffectError::UnsupportedOperator {
                attribute: "cost".into(),
                op: unit.operator.map_or_else(String::new, |op| op.to_string()),
            })?;
        let value = self.resolve_value(unit, me, Side::Player, ctx)?;
        let selector = match &unit.selector {
            Some(selector) => selector.clone(),
            None => CardSelector::parse("all").map_err(EffectError::InvalidSelector)?,
        };

        let uids = self.select(&selector, Pile::Hand, ctx);
        for uid in uids {
            let Some(card) = self.state.player.piles.card_mut(uid) else {
                continue;
            };
            let Some(next) = op.apply(card.cost, value) else {
                return Err(EffectError::InvalidValue(format!("{op}{value}")));
            };
            let before = card.cost;
            card.cost = round1(next.max(0.0));
            debug!(uid, card = %card.id, before, after = card.cost, "card cost changed");
        }
        Ok(())
    }

    fn cards_moved(&mut self, uids: Vec<u32>, to: Pile) {
        if uids.is_empty() {
            return;
        }
        debug!(?uids, %to, "cards moved");
        self.emit(BattleEvent::CardsMoved { uids, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Piles};
    use crate::core::{BattleConfig, CombatState, Combatant, Enemy, Player};
    use crate::status::StatusDefinitionStore;
    use crate::triggers::event::EventLog;

    fn executor(hand: usize, draw: usize, config: BattleConfig) -> (EffectExecutor, EventLog) {
        let mut player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
        for i in 0..hand {
            player.piles.add(Pile::Hand, Card::new(format!("h{i}"), "Hand", 1.0, ""));
        }
        for i in 0..draw {
            player.piles.add(Pile::Draw, Card::new(format!("d{i}"), "Draw", 2.0, ""));
        }
        let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
        let log = EventLog::new();
        let exec = EffectExecutor::new(CombatState::new(player, enemy, 9), StatusDefinitionStore::new(), config)
            .with_sink(log.clone());
        (exec, log)
    }

    fn run(exec: &mut EffectExecutor, text: &str) {
        exec.execute_effect_string(text, true, ExecutionContext::new())
            .unwrap();
    }

    fn piles(exec: &EffectExecutor) -> &Piles {
        &exec.state().player.piles
    }

    #[test]
    fn test_draw_count() {
        let (mut exec, log) = executor(0, 3, BattleConfig::new());
        run(&mut exec, "ME.draw+2");
        assert_eq!(piles(&exec).len(Pile::Hand), 2);
        assert_eq!(piles(&exec).hand[0].id, "d0");
        assert_eq!(log.count(|e| matches!(e, BattleEvent::CardsMoved { to: Pile::Hand, .. })), 1);
    }

    #[test]
    fn test_draw_respects_hand_limit() {
        let (mut exec, _) = executor(2, 3, BattleConfig::new().with_hand_limit(3));
        run(&mut exec, "draw+3");
        assert_eq!(piles(&exec).len(Pile::Hand), 3);
        assert_eq!(piles(&exec).len(Pile::Discard), 2);
    }

    #[test]
    fn test_draw_empty_is_skipped() {
        let (mut exec, log) = executor(0, 0, BattleConfig::new());
        run(&mut exec, "draw+1");
        assert_eq!(log.count(|e| matches!(e, BattleEvent::EffectSkipped { .. })), 1);
    }

    #[test]
    fn test_draw_selector() {
        let (mut exec, _) = executor(0, 3, BattleConfig::new());
        run(&mut exec, "draw.rightmost[1]");
        assert_eq!(piles(&exec).hand[0].id, "d2");
    }

    #[test]
    fn test_discard_and_exhaust() {
        let (mut exec, _) = executor(4, 0, BattleConfig::new());
        run(&mut exec, "discard.leftmost[1], exhaust+2");
        assert_eq!(piles(&exec).len(Pile::Discard), 1);
        assert_eq!(piles(&exec).discard_pile[0].id, "h0");
        assert_eq!(piles(&exec).len(Pile::Exhaust), 2);
        assert_eq!(piles(&exec).len(Pile::Hand), 1);
    }

    #[test]
    fn test_enemy_invoked_discard_hits_player() {
        let (mut exec, _) = executor(2, 0, BattleConfig::new());
        exec.execute_effect_string("OP.discard+1", false, ExecutionContext::new())
            .unwrap();
        assert_eq!(piles(&exec).len(Pile::Hand), 1);
    }

    #[test]
    fn test_cost_changes() {
        let (mut exec, _) = executor(2, 1, BattleConfig::new());
        run(&mut exec, "cost-1");
        assert!(piles(&exec).hand.iter().all(|c| c.cost == 0.0));
        assert_eq!(piles(&exec).draw_pile[0].cost, 2.0);

        run(&mut exec, "cost.draw.all-5");
        assert_eq!(piles(&exec).draw_pile[0].cost, 0.0);
    }

    #[test]
    fn test_current_card() {
        let (mut exec, _) = executor(2, 0, BattleConfig::new());
        let uid = piles(&exec).hand[1].uid;
        exec.execute_effect_string("exhaust.current", true, ExecutionContext::new().with_card(uid))
            .unwrap();
        assert_eq!(piles(&exec).exhaust_pile[0].uid, uid);
    }
}
