//! Effect executor integration tests.
//!
//! These drive whole effect strings through the executor and check the
//! resulting state and event stream.

use card_battle::core::{BattleConfig, BattleOutcome, CombatState, Combatant, Enemy, Player, Relic, Side};
use card_battle::effects::modifiers::resolve_modifier;
use card_battle::effects::{process_stacks_expression, EffectExecutor, ExecutionContext, ModifierType};
use card_battle::status::{StatusDefinitionStore, StatusEffectDefinition, StatusTriggerKind, StatusType};
use card_battle::triggers::{BattleEvent, EventLog};

fn battle(player_hp: f64, enemy_hp: f64, store: StatusDefinitionStore) -> (EffectExecutor, EventLog) {
    let player = Player::new(Combatant::new("Hero", player_hp, 100.0), 3.0);
    let enemy = Enemy::new(Combatant::new("Slime", enemy_hp, 40.0));
    let log = EventLog::new();
    let exec = EffectExecutor::new(CombatState::new(player, enemy, 42), store, BattleConfig::new())
        .with_sink(log.clone());
    (exec, log)
}

fn run(exec: &mut EffectExecutor, text: &str, source_is_player: bool) {
    exec.execute_effect_string(text, source_is_player, ExecutionContext::new())
        .unwrap();
}

/// `ALL.hp-3` hits the invoker first, then its opponent.
#[test]
fn test_all_expands_me_then_op() {
    let (mut exec, log) = battle(50.0, 30.0, StatusDefinitionStore::new());
    run(&mut exec, "ALL.hp-3", false);

    let damaged: Vec<Side> = log
        .events()
        .iter()
        .filter_map(|e| match e {
            BattleEvent::Damaged { side, .. } => Some(*side),
            _ => None,
        })
        .collect();
    assert_eq!(damaged, vec![Side::Enemy, Side::Player]);
    assert_eq!(exec.state().player.combatant.current_hp, 47.0);
    assert_eq!(exec.state().enemy.combatant.current_hp, 27.0);
}

/// Conditionals run last and see changes made earlier in the batch.
#[test]
fn test_conditional_sees_block_change() {
    let (mut exec, _) = battle(50.0, 30.0, StatusDefinitionStore::new());
    run(&mut exec, "if[ME.block>=5][OP.hp-10][OP.hp-1], ME.block+5", true);
    assert_eq!(exec.state().enemy.combatant.current_hp, 20.0);
}

#[test]
fn test_block_absorbs_before_hp() {
    let (mut exec, log) = battle(50.0, 30.0, StatusDefinitionStore::new());
    run(&mut exec, "ME.block+5", true);
    run(&mut exec, "OP.hp-8", false);

    let hero = &exec.state().player.combatant;
    assert_eq!(hero.block, 0.0);
    assert_eq!(hero.current_hp, 47.0);
    assert!(log.events().contains(&BattleEvent::Damaged {
        side: Side::Player,
        amount: 3.0,
        blocked: 5.0,
    }));
}

#[test]
fn test_hold_modifier_scales_with_stacks() {
    let mut store = StatusDefinitionStore::new();
    store.define(
        StatusEffectDefinition::new("rage", "Rage", StatusType::Buff)
            .with_trigger(StatusTriggerKind::Hold, "ME.damage_modifier+0.25*stacks"),
    );
    let (mut exec, _) = battle(50.0, 30.0, store);
    exec.apply_status(Side::Enemy, "rage", 4).unwrap();

    let breakdown = resolve_modifier(exec.state(), exec.store(), Side::Enemy, ModifierType::Damage);
    assert_eq!(breakdown.add, 1.0);
    assert_eq!(breakdown.mul, 1.0);

    run(&mut exec, "OP.hp-5", false);
    assert_eq!(exec.state().player.combatant.current_hp, 44.0);
}

#[test]
fn test_damage_taken_modifier_on_self_damage() {
    let mut store = StatusDefinitionStore::new();
    store.define(
        StatusEffectDefinition::new("frail", "Frail", StatusType::Debuff)
            .with_trigger(StatusTriggerKind::Hold, "ME.damage_taken_modifier+2"),
    );
    let (mut exec, _) = battle(50.0, 30.0, store);
    exec.apply_status(Side::Player, "frail", 1).unwrap();

    run(&mut exec, "ME.hp-6", true);
    assert_eq!(exec.state().player.combatant.current_hp, 42.0);
}

#[test]
fn test_relic_passive_and_multiplier() {
    let player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0)
        .with_relic(Relic::new("fang", "Fang", "passive(ME.damage_modifier+2, ME.damage_modifier*1.5)"));
    let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
    let mut exec = EffectExecutor::new(
        CombatState::new(player, enemy, 1),
        StatusDefinitionStore::new(),
        BattleConfig::new(),
    );
    run(&mut exec, "OP.hp-4", true);
    // (4 + 2) * 1.5
    assert_eq!(exec.state().enemy.combatant.current_hp, 21.0);
}

#[test]
fn test_stacks_expression_is_idempotent() {
    let once = process_stacks_expression("damage_modifier+2", 3);
    assert_eq!(once, "ME.damage_modifier+2");
    assert_eq!(process_stacks_expression(&once, 3), once);
    assert_eq!(
        process_stacks_expression("OP.hp-stacks*2", 3),
        "OP.hp-3*2"
    );
}

#[test]
fn test_simultaneous_lethal_player_wins() {
    let (mut exec, log) = battle(5.0, 5.0, StatusDefinitionStore::new());
    run(&mut exec, "ALL.hp-10", false);

    assert_eq!(exec.state().outcome, Some(BattleOutcome::Victory));
    assert_eq!(log.count(|e| matches!(e, BattleEvent::GameOver { .. })), 1);
    assert!(log
        .events()
        .contains(&BattleEvent::GameOver { winner: Side::Player }));

    // further lethal damage never produces a second transition
    run(&mut exec, "OP.hp-10", false);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::GameOver { .. })), 1);
}

#[test]
fn test_bad_units_are_skipped() {
    let (mut exec, log) = battle(50.0, 30.0, StatusDefinitionStore::new());
    run(&mut exec, "OP.mana-3, hp-2, OP.hp-%%, OP.status.apply(nothing), OP.hp-4", true);

    assert_eq!(exec.state().enemy.combatant.current_hp, 26.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::EffectSkipped { .. })), 4);
}

#[test]
fn test_variables_in_values() {
    let (mut exec, _) = battle(50.0, 30.0, StatusDefinitionStore::new());
    run(&mut exec, "ME.block+OP.hp*0.5", true);
    assert_eq!(exec.state().player.combatant.block, 15.0);

    run(&mut exec, "OP.hp-ME.block", true);
    assert_eq!(exec.state().enemy.combatant.current_hp, 15.0);
}

#[test]
fn test_checkpoint_is_deterministic() {
    let (mut exec, _) = battle(50.0, 30.0, StatusDefinitionStore::new());
    run(&mut exec, "OP.hp-3, ME.lust+7", true);

    let bytes = exec.state().checkpoint().unwrap();
    let restored = CombatState::restore(&bytes).unwrap();
    assert_eq!(restored.enemy, exec.state().enemy);
    assert_eq!(restored.player, exec.state().player);
}
