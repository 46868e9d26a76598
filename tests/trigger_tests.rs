//! Trigger system integration tests.
//!
//! These tests verify ability dispatch, relic triggers, lust overflow and
//! the nesting guard working together with the effect executor.

use card_battle::core::{BattleConfig, CombatState, Combatant, Enemy, Player, Relic, Side};
use card_battle::effects::{EffectExecutor, ExecutionContext};
use card_battle::status::StatusDefinitionStore;
use card_battle::triggers::{Ability, BattleEvent, EventLog, TriggerKind};

fn executor(player: Player, enemy: Enemy, config: BattleConfig) -> (EffectExecutor, EventLog) {
    let log = EventLog::new();
    let exec = EffectExecutor::new(CombatState::new(player, enemy, 11), StatusDefinitionStore::new(), config)
        .with_sink(log.clone());
    (exec, log)
}

fn hero() -> Player {
    Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0)
}

fn slime() -> Enemy {
    Enemy::new(Combatant::new("Slime", 30.0, 40.0))
}

fn run(exec: &mut EffectExecutor, text: &str, source_is_player: bool) {
    exec.execute_effect_string(text, source_is_player, ExecutionContext::new())
        .unwrap();
}

/// block 5, incoming 8: block gone, hp -3, `lose_block` fires once.
#[test]
fn test_lose_block_fires_once() {
    let mut player = hero();
    player.combatant = player
        .combatant
        .with_ability(Ability::from_effect("guard", "lose_block(ME.lust+1)").unwrap());
    let (mut exec, log) = executor(player, slime(), BattleConfig::new());

    run(&mut exec, "ME.block+5", true);
    run(&mut exec, "OP.hp-8", false);

    let hero = &exec.state().player.combatant;
    assert_eq!(hero.block, 0.0);
    assert_eq!(hero.current_hp, 47.0);
    assert_eq!(hero.current_lust, 1.0);
    assert_eq!(log.triggered(), vec!["lose_block"]);
}

/// Reaching max lust fires the overflow effect once and resets lust.
#[test]
fn test_lust_overflow_once() {
    let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0).with_overflow_effect("OP.hp-10"));
    let (mut exec, log) = executor(hero(), enemy, BattleConfig::new());

    run(&mut exec, "ME.lust+100", true);
    assert_eq!(exec.state().player.combatant.current_lust, 0.0);
    assert_eq!(exec.state().player.combatant.current_hp, 40.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::LustOverflow { .. })), 1);

    // no lust gain, no overflow
    run(&mut exec, "ME.lust+0", true);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::LustOverflow { .. })), 1);

    run(&mut exec, "ME.lust+60", true);
    assert_eq!(exec.state().player.combatant.current_lust, 60.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::LustOverflow { .. })), 1);
}

#[test]
fn test_overflow_ability_fires() {
    let mut player = hero();
    player.combatant = player
        .combatant
        .with_ability(Ability::from_effect("calm", "lust_overflow(ME.block+10)").unwrap());
    let (mut exec, _) = executor(player, slime(), BattleConfig::new());

    run(&mut exec, "OP.lust+150", false);
    assert_eq!(exec.state().player.combatant.block, 10.0);
    assert_eq!(exec.state().player.combatant.current_lust, 0.0);
}

#[test]
fn test_relic_triggers_only_for_player() {
    let player = hero().with_relic(Relic::new("charm", "Charm", "turn_start(ME.block+3), turn_end(OP.hp-1)"));
    let (mut exec, log) = executor(player, slime(), BattleConfig::new());

    exec.process_turn_start(Side::Enemy);
    assert_eq!(exec.state().player.combatant.block, 0.0);

    exec.process_turn_start(Side::Player);
    exec.process_turn_end(Side::Player);
    assert_eq!(exec.state().player.combatant.block, 3.0);
    assert_eq!(exec.state().enemy.combatant.current_hp, 29.0);
    assert_eq!(log.triggered(), vec!["turn_start", "turn_end"]);
}

#[test]
fn test_ability_me_is_holder() {
    let enemy = Enemy::new(
        Combatant::new("Slime", 30.0, 40.0)
            .with_ability(Ability::from_effect("spite", "take_damage(OP.hp-2, ME.block+1)").unwrap()),
    );
    let (mut exec, _) = executor(hero(), enemy, BattleConfig::new());

    run(&mut exec, "OP.hp-5", true);
    assert_eq!(exec.state().enemy.combatant.current_hp, 25.0);
    assert_eq!(exec.state().enemy.combatant.block, 1.0);
    assert_eq!(exec.state().player.combatant.current_hp, 48.0);
}

#[test]
fn test_deal_damage_and_heal_triggers() {
    let mut player = hero();
    player.combatant = player
        .combatant
        .with_ability(Ability::from_effect("leech", "deal_damage(ME.hp+1)").unwrap())
        .with_ability(Ability::from_effect("glow", "take_heal(ME.block+2)").unwrap());
    player.combatant.current_hp = 40.0;
    let (mut exec, log) = executor(player, slime(), BattleConfig::new());

    run(&mut exec, "OP.hp-4", true);
    assert_eq!(exec.state().player.combatant.current_hp, 41.0);
    assert_eq!(exec.state().player.combatant.block, 2.0);
    assert_eq!(log.triggered(), vec!["deal_damage", "take_heal"]);
}

#[test]
fn test_gain_buff_and_debuff() {
    let mut store = StatusDefinitionStore::new();
    store
        .load_json(
            r#"[{"id": "might", "name": "Might", "type": "buff"},
                {"id": "weak", "name": "Weak", "type": "debuff"}]"#,
        )
        .unwrap();
    let mut player = hero();
    player.combatant = player
        .combatant
        .with_ability(Ability::from_effect("a", "gain_buff(ME.block+1)").unwrap())
        .with_ability(Ability::from_effect("b", "gain_debuff(ME.block+10)").unwrap());
    let mut exec = EffectExecutor::new(CombatState::new(player, slime(), 1), store, BattleConfig::new());

    run(&mut exec, "ME.status.apply(might), OP.status.apply(weak 2)", true);
    assert_eq!(exec.state().player.combatant.block, 1.0);

    run(&mut exec, "OP.status.apply(weak)", false);
    assert_eq!(exec.state().player.combatant.block, 11.0);
}

#[test]
fn test_removed_ability_stops_firing() {
    let (mut exec, _) = executor(hero(), slime(), BattleConfig::new());
    let id = exec.add_ability(Side::Player, "turn_start(ME.block+1)").unwrap();
    exec.add_ability(Side::Player, "turn_start(ME.block+1)").unwrap();
    assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::TurnStart), 2);

    assert_eq!(exec.remove_abilities(Side::Player, &id), 1);
    assert_eq!(exec.fire_trigger(Side::Player, TriggerKind::TurnStart), 1);
    assert_eq!(exec.state().player.combatant.block, 3.0);

    assert!(exec.add_ability(Side::Player, "ME.block+1").is_err());
}

/// `gain_block(ME.block+1)` would recurse forever without the depth guard.
#[test]
fn test_feedback_loop_terminates() {
    let mut player = hero();
    player.combatant = player
        .combatant
        .with_ability(Ability::from_effect("loop", "gain_block(ME.block+1)").unwrap());
    let (mut exec, _) = executor(player, slime(), BattleConfig::new().with_max_nesting_depth(16));

    run(&mut exec, "ME.block+1, OP.hp-2", true);
    assert_eq!(exec.state().player.combatant.block, 16.0);
    assert_eq!(exec.state().enemy.combatant.current_hp, 28.0);
    assert_eq!(exec.depth(), 0);
}
