//! Status effect lifecycle integration tests.
//!
//! Definitions are loaded from JSON the way the host stores them.

use card_battle::core::{BattleConfig, CombatState, Combatant, Enemy, Player, Side};
use card_battle::effects::{EffectExecutor, ExecutionContext};
use card_battle::status::{StatusDefinitionStore, StatusType};
use card_battle::triggers::{BattleEvent, EventLog};

const DEFINITIONS: &str = r#"[
    [
        {"id": "burn", "name": "Burn", "type": "debuff", "stacks_change": -1, "maxStacks": 5,
         "triggers": {"tick": "ME.hp-stacks"}, "source": "system", "createdAt": 0},
        {"id": "poison", "name": "Poison", "type": "debuff", "stacks_change": "x0.5",
         "triggers": {"tick": ["ME.hp-stacks"], "stack": "ME.lust+1"}}
    ],
    {"id": "fortify", "name": "Fortify", "type": "buff",
     "triggers": {"apply": "ME.block+stacks*2", "remove": "ME.block-100", "hold": "ME.block_modifier+1"}},
    {"id": "mirror", "name": "Mirror", "type": "buff",
     "triggers": {"take_damage": "OP.hp-stacks"}},
    {"name": "missing id"}
]"#;

fn battle() -> (EffectExecutor, EventLog) {
    let mut store = StatusDefinitionStore::new();
    assert_eq!(store.load_json(DEFINITIONS).unwrap(), 4);

    let player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
    let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
    let log = EventLog::new();
    let exec = EffectExecutor::new(CombatState::new(player, enemy, 3), store, BattleConfig::new())
        .with_sink(log.clone());
    (exec, log)
}

fn run(exec: &mut EffectExecutor, text: &str, source_is_player: bool) {
    exec.execute_effect_string(text, source_is_player, ExecutionContext::new())
        .unwrap();
}

#[test]
fn test_definitions_load_flattened() {
    let (exec, _) = battle();
    let store = exec.store();
    assert_eq!(store.get("poison").unwrap().status_type, StatusType::Debuff);
    assert_eq!(store.get("burn").unwrap().max_stacks, Some(5));
    assert!(store.get("fortify").unwrap().triggers.apply.iter().next().is_some());
}

/// Applying then querying gives `min(requested, maxStacks)`.
#[test]
fn test_apply_is_capped() {
    let (mut exec, log) = battle();
    exec.apply_status(Side::Enemy, "burn", 9).unwrap();
    assert_eq!(exec.state().enemy.combatant.stacks_of("burn"), 5);

    exec.apply_status(Side::Player, "fortify", 1500).unwrap();
    assert_eq!(exec.state().player.combatant.stacks_of("fortify"), 999);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::StatusApplied { .. })), 2);
}

#[test]
fn test_debuff_from_card_lands_on_opponent() {
    let (mut exec, _) = battle();
    run(&mut exec, "status.apply(burn 2)", true);
    assert_eq!(exec.state().enemy.combatant.stacks_of("burn"), 2);
    assert_eq!(exec.state().player.combatant.stacks_of("burn"), 0);

    run(&mut exec, "OP.status.apply(burn:1)", false);
    assert_eq!(exec.state().player.combatant.stacks_of("burn"), 1);
}

#[test]
fn test_apply_trigger_and_hold_modifier() {
    let (mut exec, _) = battle();
    // the status is already held when its apply trigger runs, so its own
    // hold modifier counts
    run(&mut exec, "ME.status.apply(fortify 3)", true);
    assert_eq!(exec.state().player.combatant.block, 7.0);

    run(&mut exec, "ME.block+2", true);
    assert_eq!(exec.state().player.combatant.block, 10.0);
}

#[test]
fn test_remove_trigger_runs_before_removal() {
    let (mut exec, log) = battle();
    run(&mut exec, "ME.status.apply(fortify 1)", true);
    run(&mut exec, "ME.status.remove(fortify)", true);

    let hero = &exec.state().player.combatant;
    assert!(hero.status("fortify").is_none());
    assert_eq!(hero.block, 0.0);
    assert_eq!(log.count(|e| matches!(e, BattleEvent::StatusRemoved { .. })), 1);
}

#[test]
fn test_stack_trigger_replaces_default_add() {
    let (mut exec, _) = battle();
    exec.apply_status(Side::Enemy, "poison", 4).unwrap();
    exec.apply_status(Side::Enemy, "poison", 4).unwrap();

    let slime = &exec.state().enemy.combatant;
    assert_eq!(slime.stacks_of("poison"), 4);
    assert_eq!(slime.current_lust, 1.0);
}

#[test]
fn test_turn_end_ticks_then_decays() {
    let (mut exec, _) = battle();
    exec.apply_status(Side::Enemy, "burn", 3).unwrap();
    exec.apply_status(Side::Enemy, "poison", 5).unwrap();

    exec.process_turn_end(Side::Enemy);
    let slime = &exec.state().enemy.combatant;
    assert_eq!(slime.current_hp, 22.0);
    assert_eq!(slime.stacks_of("burn"), 2);
    assert_eq!(slime.stacks_of("poison"), 2);

    exec.process_turn_end(Side::Enemy);
    exec.process_turn_end(Side::Enemy);
    let slime = &exec.state().enemy.combatant;
    assert_eq!(slime.stacks_of("burn"), 0);
    assert!(slime.status("poison").is_none());
    assert_eq!(slime.current_hp, 16.0);
}

#[test]
fn test_stacks_unit_sets_and_removes() {
    let (mut exec, log) = battle();
    run(&mut exec, "OP.status.apply(burn 2)", true);
    run(&mut exec, "OP.stacks.burn+2", true);
    assert_eq!(exec.state().enemy.combatant.stacks_of("burn"), 4);

    run(&mut exec, "OP.stacks.burn=0", true);
    assert!(exec.state().enemy.combatant.status("burn").is_none());
    assert!(log.events().contains(&BattleEvent::StatusRemoved {
        side: Side::Enemy,
        status: "burn".into(),
    }));
}

#[test]
fn test_event_key_reacts_to_damage() {
    let (mut exec, _) = battle();
    exec.apply_status(Side::Player, "mirror", 3).unwrap();
    run(&mut exec, "OP.hp-4", false);
    assert_eq!(exec.state().player.combatant.current_hp, 46.0);
    assert_eq!(exec.state().enemy.combatant.current_hp, 27.0);
}
