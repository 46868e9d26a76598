//! Trigger dispatch.
//!
//! Firing a lifecycle event for a side runs, in order:
//!
//! 1. the side's abilities listening to it
//! 2. status definitions with an extra trigger key named after it
//! 3. the player's relic segments wrapped in it (player only)
//!
//! Ability lists are snapshotted before a pass, so abilities added or
//! removed by the effects they run only matter for the next event.

use tracing::{debug, warn};

use super::ability::{extract_trigger, is_trigger_keyword, Ability, TriggerKind};
use super::event::BattleEvent;
use crate::core::{EffectError, Side};
use crate::effects::context::ExecutionContext;
use crate::effects::executor::EffectExecutor;
use crate::effects::expression::{EffectExpression, EffectValue, Operator, Target};
use crate::effects::parser::split_units;
use crate::effects::Result;

impl EffectExecutor {
    /// Fire `kind` for `side` from outside any execution.
    ///
    /// Returns how many effect texts ran.
    pub fn fire_trigger(&mut self, side: Side, kind: TriggerKind) -> usize {
        self.dispatch(side, kind, &ExecutionContext::new())
    }

    pub(crate) fn dispatch(&mut self, side: Side, kind: TriggerKind, ctx: &ExecutionContext) -> usize {
        if kind == TriggerKind::Passive {
            return 0;
        }
        let mut fired = self.fire_ability_trigger(side, kind, ctx);
        fired += self.fire_status_event(side, kind, ctx);
        if side == Side::Player {
            fired += self.fire_relic_trigger(kind, ctx);
        }
        fired
    }

    /// Run every ability of `side` whose stored text is wrapped in `kind`.
    fn fire_ability_trigger(&mut self, side: Side, kind: TriggerKind, ctx: &ExecutionContext) -> usize {
        let trigger = kind.as_str();
        let abilities = self.state.combatant(side).abilities.clone();
        let mut fired = 0;

        for ability in &abilities {
            if self.state.is_over() {
                break;
            }
            let Some(inner) = ability.inner_for(trigger) else {
                if ability.trigger == trigger {
                    warn!(%side, id = %ability.id, effect = %ability.effect, "ability text does not match its trigger; skipped");
                }
                continue;
            };

            fired += 1;
            debug!(%side, trigger, id = %ability.id, "ability triggered");
            self.emit(BattleEvent::AbilityTriggered {
                side,
                trigger: trigger.to_string(),
                effect: inner.to_string(),
            });
            let child = ctx.child().with_trigger(trigger).with_ability(ability.id.as_str());
            if let Err(err) = self.execute_effect_string(inner, side.is_player(), child) {
                warn!(%side, trigger, id = %ability.id, error = %err, "ability effect failed");
            }
        }
        fired
    }

    /// Run status definitions' extra trigger keys named after `kind`.
    fn fire_status_event(&mut self, side: Side, kind: TriggerKind, ctx: &ExecutionContext) -> usize {
        let trigger = kind.as_str();
        let held = self.state.combatant(side).status_effects.clone();
        let mut fired = 0;

        for status in &held {
            let stacks = self.state.combatant(side).stacks_of(&status.id);
            if stacks == 0 {
                continue;
            }
            let Some(def) = self.store.get(&status.id).cloned() else {
                continue;
            };
            if let Some(texts) = def.triggers.for_event(trigger) {
                fired += self.run_status_texts(side, &def, texts.iter(), trigger, stacks, ctx);
            }
        }
        fired
    }

    /// Run the `kind(...)` segments of the player's relics.
    fn fire_relic_trigger(&mut self, kind: TriggerKind, ctx: &ExecutionContext) -> usize {
        let trigger = kind.as_str();
        let relics: Vec<(String, String)> = self
            .state
            .player
            .relics
            .iter()
            .map(|r| (r.id.clone(), r.effect.clone()))
            .collect();
        let mut fired = 0;

        for (id, effect) in &relics {
            for segment in split_units(effect) {
                let Some((name, inner)) = extract_trigger(segment) else {
                    continue;
                };
                if name != trigger || inner.is_empty() {
                    continue;
                }
                fired += 1;
                debug!(relic = %id, trigger, "relic triggered");
                self.emit(BattleEvent::AbilityTriggered {
                    side: Side::Player,
                    trigger: trigger.to_string(),
                    effect: inner.to_string(),
                });
                let child = ctx.child().with_trigger(trigger).relic();
                if let Err(err) = self.execute_effect_string(inner, true, child) {
                    warn!(relic = %id, trigger, error = %err, "relic effect failed");
                }
            }
        }
        fired
    }

    /// Start of `side`'s turn: `turn_start` abilities, status extras and
    /// relics.
    pub fn process_turn_start(&mut self, side: Side) {
        debug!(%side, turn = self.state.turn, "turn start");
        self.dispatch(side, TriggerKind::TurnStart, &ExecutionContext::new());
    }

    /// End of `side`'s turn: status ticks, `turn_end` triggers, then stack
    /// decay.
    pub fn process_turn_end(&mut self, side: Side) {
        debug!(%side, turn = self.state.turn, "turn end");
        let ctx = ExecutionContext::new();
        self.tick_statuses(side, &ctx);
        if self.state.is_over() {
            return;
        }
        self.dispatch(side, TriggerKind::TurnEnd, &ctx);
        if self.state.is_over() {
            return;
        }
        self.decay_statuses(side, &ctx);
    }

    /// Attach an ability given as `trigger(...)` text. Returns its id.
    pub fn add_ability(&mut self, side: Side, effect: &str) -> Result<String> {
        let id = self.next_ability_id();
        let ability = Ability::from_effect(id.clone(), effect)
            .filter(|a| is_trigger_keyword(&a.trigger))
            .ok_or_else(|| EffectError::InvalidValue(effect.to_string()))?;

        debug!(%side, %id, effect, "ability added");
        self.state.combatant_mut(side).abilities.push_back(ability);
        self.emit(BattleEvent::AbilityAdded {
            side,
            ability: effect.to_string(),
        });
        Ok(id)
    }

    /// Remove abilities by trigger keyword (every match) or by id.
    pub fn remove_abilities(&mut self, side: Side, key: &str) -> usize {
        let by_trigger = is_trigger_keyword(key);
        let abilities = &mut self.state.combatant_mut(side).abilities;
        let before = abilities.len();
        abilities.retain(|a| if by_trigger { a.trigger != key } else { a.id != key });
        let removed = before - abilities.len();
        debug!(%side, key, removed, "abilities removed");
        removed
    }

    /// `ability.add(...)`, `ability.remove(...)` and bare `trigger(...)`.
    ///
    /// Without a target the ability goes to the invoking side.
    pub(crate) fn execute_ability_unit(
        &mut self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let side = match unit.target.or(ctx.target_type) {
            Some(Target::All) => return Err(EffectError::UnexpandedAll(unit.raw.clone())),
            Some(Target::Op) => me.opponent(),
            Some(Target::Me) | None => me,
        };
        let Some(EffectValue::Text(text)) = &unit.value else {
            return Err(EffectError::InvalidValue(unit.raw.clone()));
        };

        match unit.operator {
            Some(Operator::Add) => self.add_ability(side, text).map(|_| ()),
            Some(Operator::Remove) => {
                self.remove_abilities(side, text);
                Ok(())
            }
            other => Err(EffectError::UnsupportedOperator {
                attribute: "ability".into(),
                op: other.map_or_else(String::new, |op| op.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BattleConfig, CombatState, Combatant, Enemy, Player, Relic};
    use crate::status::{StatusDefinitionStore, StatusEffectDefinition, StatusTriggerKind, StatusType};
    use crate::triggers::event::EventLog;

    fn executor(player: Player, store: StatusDefinitionStore) -> (EffectExecutor, EventLog) {
        let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
        let log = EventLog::new();
        let exec = EffectExecutor::new(CombatState::new(player, enemy, 1), store, BattleConfig::new())
            .with_sink(log.clone());
        (exec, log)
    }

    fn hero() -> Player {
        Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0)
    }

    #[test]
    fn test_wrapped_unit_adds_ability() {
        let (mut exec, log) = executor(hero(), StatusDefinitionStore::new());
        exec.execute_effect_string("turn_start(ME.block+3)", true, ExecutionContext::new())
            .unwrap();
        assert_eq!(exec.state().player.combatant.abilities.len(), 1);
        assert_eq!(exec.state().player.combatant.block, 0.0);

        exec.process_turn_start(Side::Player);
        assert_eq!(exec.state().player.combatant.block, 3.0);
        assert_eq!(log.triggered(), vec!["turn_start"]);
    }

    #[test]
    fn test_ability_add_and_remove_verbs() {
        let (mut exec, _) = executor(hero(), StatusDefinitionStore::new());
        exec.execute_effect_string(
            "OP.ability.add(turn_end(ME.hp+1)), OP.ability.add(turn_end(ME.hp+2))",
            true,
            ExecutionContext::new(),
        )
        .unwrap();
        assert_eq!(exec.state().enemy.combatant.abilities.len(), 2);

        exec.execute_effect_string("OP.ability.remove(turn_end)", true, ExecutionContext::new())
            .unwrap();
        assert!(exec.state().enemy.combatant.abilities.is_empty());
    }

    #[test]
    fn test_duplicates_fire_independently() {
        let mut player = hero();
        player.combatant = player
            .combatant
            .with_ability(Ability::from_effect("a", "turn_start(ME.block+2)").unwrap())
            .with_ability(Ability::from_effect("b", "turn_start(ME.block+2)").unwrap());
        let (mut exec, _) = executor(player, StatusDefinitionStore::new());
        assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::TurnStart), 2);
        assert_eq!(exec.state().player.combatant.block, 4.0);
    }

    #[test]
    fn test_snapshot_ignores_abilities_added_mid_pass() {
        let mut player = hero();
        player.combatant = player.combatant.with_ability(
            Ability::from_effect("grow", "turn_start(ME.ability.add(turn_start(ME.block+1)))").unwrap(),
        );
        let (mut exec, _) = executor(player, StatusDefinitionStore::new());
        assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::TurnStart), 1);
        assert_eq!(exec.state().player.combatant.block, 0.0);
        assert_eq!(exec.state().player.combatant.abilities.len(), 2);
    }

    #[test]
    fn test_mismatched_ability_is_skipped() {
        let mut player = hero();
        player.combatant.abilities.push_back(Ability {
            id: "broken".into(),
            trigger: "turn_start".into(),
            effect: "ME.block+5".into(),
            description: String::new(),
        });
        let (mut exec, _) = executor(player, StatusDefinitionStore::new());
        assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::TurnStart), 0);
        assert_eq!(exec.state().player.combatant.block, 0.0);
    }

    #[test]
    fn test_relic_segments() {
        let player = hero().with_relic(Relic::new(
            "ring",
            "Ring",
            "passive(ME.damage_modifier+1), battle_start(ME.block+4), turn_end(ME.hp-1)",
        ));
        let (mut exec, _) = executor(player, StatusDefinitionStore::new());
        assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::BattleStart), 1);
        assert_eq!(exec.state().player.combatant.block, 4.0);
        assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::Passive), 0);
    }

    #[test]
    fn test_status_event_keys() {
        let mut store = StatusDefinitionStore::new();
        store.define(
            StatusEffectDefinition::new("thorns", "Thorns", StatusType::Buff)
                .on_event("take_damage", "OP.hp-stacks"),
        );
        let (mut exec, _) = executor(hero(), store);
        exec.apply_status(Side::Player, "thorns", 2).unwrap();

        exec.execute_effect_string("OP.hp-5", false, ExecutionContext::new())
            .unwrap();
        assert_eq!(exec.state().player.combatant.current_hp, 45.0);
        assert_eq!(exec.state().enemy.combatant.current_hp, 28.0);
    }

    #[test]
    fn test_skipped_unit_names_its_ability() {
        let (mut exec, log) = executor(hero(), StatusDefinitionStore::new());
        let id = exec.add_ability(Side::Player, "turn_start(ME.mana+1)").unwrap();
        exec.fire_trigger(Side::Player, TriggerKind::TurnStart);

        let origins: Vec<Option<String>> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                BattleEvent::EffectSkipped { origin, .. } => Some(origin),
                _ => None,
            })
            .collect();
        assert_eq!(origins, vec![Some(format!("ability {id} on turn_start"))]);
    }

    #[test]
    fn test_feedback_loop_is_bounded() {
        let mut player = hero();
        player.combatant = player
            .combatant
            .with_ability(Ability::from_effect("loop", "gain_block(ME.block+1)").unwrap());
        let (exec, _) = executor(player, StatusDefinitionStore::new());
        let mut exec = exec.with_config(BattleConfig::new().with_max_nesting_depth(8));
        exec.execute_effect_string("ME.block+1", true, ExecutionContext::new())
            .unwrap();
        let block = exec.state().player.combatant.block;
        assert!(block > 1.0 && block <= 8.0, "block = {block}");
        assert_eq!(exec.depth(), 0);
    }

    #[test]
    fn test_turn_end_order() {
        let mut store = StatusDefinitionStore::new();
        store.define(
            StatusEffectDefinition::new("poison", "Poison", StatusType::Debuff)
                .with_trigger(StatusTriggerKind::Tick, "ME.hp-stacks")
                .with_stacks_change(crate::status::StacksChange::Factor(0.5)),
        );
        let (mut exec, _) = executor(hero(), store);
        exec.apply_status(Side::Enemy, "poison", 5).unwrap();
        exec.process_turn_end(Side::Enemy);
        assert_eq!(exec.state().enemy.combatant.current_hp, 25.0);
        assert_eq!(exec.state().enemy.combatant.stacks_of("poison"), 2);
    }
}
