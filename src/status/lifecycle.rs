//! Status lifecycle: absent → applied → held → removed.
//!
//! - **apply**: a new instance is created from its definition (stacks capped
//!   at `maxStacks`), the `apply` triggers fire, then `gain_buff` or
//!   `gain_debuff` fires on the holder.
//! - **re-apply**: the `stack` triggers fire with `stacks` set to the
//!   requested amount; without a `stack` trigger the stacks are added.
//! - **turn end**: `tick` triggers fire, then decay by `stacks_change`.
//! - **removal**: at 0 stacks the `remove` triggers fire with the
//!   pre-removal count, the instance goes, and any directly stored modifier
//!   the status texts mention is cleared.
//!
//! Every trigger runs with `ME` bound to the holder.

use tracing::{debug, warn};

use super::definition::{StatusEffectDefinition, StatusTriggerKind, StatusType};
use super::instance::StatusEffectInstance;
use crate::core::{EffectError, Side};
use crate::effects::attributes::MODIFIER_ATTRIBUTES;
use crate::effects::context::{ExecutionContext, StatusContext};
use crate::effects::executor::EffectExecutor;
use crate::effects::expression::{EffectExpression, Operator, Target};
use crate::effects::modifiers::process_stacks_expression;
use crate::effects::Result;
use crate::triggers::ability::TriggerKind;
use crate::triggers::event::BattleEvent;

impl EffectExecutor {
    /// Apply `stacks` of status `id` to `holder`.
    ///
    /// ```
    /// use card_battle::core::{BattleConfig, CombatState, Combatant, Enemy, Player, Side};
    /// use card_battle::effects::EffectExecutor;
    /// use card_battle::status::{StatusDefinitionStore, StatusEffectDefinition, StatusType};
    ///
    /// let mut store = StatusDefinitionStore::new();
    /// store.define(StatusEffectDefinition::new("burn", "Burn", StatusType::Debuff).with_max_stacks(5));
    /// let state = CombatState::new(
    ///     Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0),
    ///     Enemy::new(Combatant::new("Slime", 30.0, 40.0)),
    ///     1,
    /// );
    /// let mut exec = EffectExecutor::new(state, store, BattleConfig::new());
    ///
    /// exec.apply_status(Side::Enemy, "burn", 8).unwrap();
    /// assert_eq!(exec.state().enemy.combatant.stacks_of("burn"), 5);
    /// ```
    pub fn apply_status(&mut self, holder: Side, id: &str, stacks: u32) -> Result<()> {
        self.apply_status_in(holder, id, stacks, &ExecutionContext::new())
    }

    pub(crate) fn apply_status_in(
        &mut self,
        holder: Side,
        id: &str,
        stacks: u32,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let def = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| EffectError::UnknownStatus(id.to_string()))?;
        let cap = def.stack_cap(self.config.default_max_stacks);
        let requested = stacks.min(cap);
        if requested == 0 {
            debug!(status = id, "applying 0 stacks; nothing to do");
            return Ok(());
        }

        let held = self.state.combatant(holder).stacks_of(id);
        if held > 0 {
            if def.triggers.stack.is_empty() {
                return self.set_stacks_in(holder, id, held.saturating_add(requested), ctx);
            }
            self.fire_status_trigger(holder, &def, StatusTriggerKind::Stack, requested, ctx);
            return Ok(());
        }

        self.state
            .combatant_mut(holder)
            .status_effects
            .push_back(StatusEffectInstance::from_definition(&def, requested));
        debug!(%holder, status = id, stacks = requested, "status applied");
        self.emit(BattleEvent::StatusApplied {
            side: holder,
            status: id.to_string(),
            stacks: requested,
        });

        self.fire_status_trigger(holder, &def, StatusTriggerKind::Apply, requested, ctx);
        match def.status_type {
            StatusType::Buff => {
                self.dispatch(holder, TriggerKind::GainBuff, ctx);
            }
            StatusType::Debuff => {
                self.dispatch(holder, TriggerKind::GainDebuff, ctx);
            }
            StatusType::Neutral => {}
        }
        Ok(())
    }

    /// Remove a held status entirely (`None`) or subtract stacks.
    pub fn remove_status(&mut self, holder: Side, id: &str, amount: Option<u32>) -> Result<()> {
        self.remove_status_in(holder, id, amount, &ExecutionContext::new())
    }

    pub(crate) fn remove_status_in(
        &mut self,
        holder: Side,
        id: &str,
        amount: Option<u32>,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let held = self.state.combatant(holder).stacks_of(id);
        if held == 0 {
            return Err(EffectError::StatusNotHeld {
                status: id.to_string(),
                side: holder,
            });
        }
        match amount {
            None => {
                self.remove_instance(holder, id, ctx);
                Ok(())
            }
            Some(n) => self.set_stacks_in(holder, id, held.saturating_sub(n), ctx),
        }
    }

    /// Set the stacks of a held status, clamped to its cap. Reaching 0
    /// removes it.
    pub fn set_stacks(&mut self, holder: Side, id: &str, stacks: u32) -> Result<()> {
        self.set_stacks_in(holder, id, stacks, &ExecutionContext::new())
    }

    pub(crate) fn set_stacks_in(
        &mut self,
        holder: Side,
        id: &str,
        stacks: u32,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let default_cap = self.config.default_max_stacks;
        let cap = self.store.get(id).map_or(default_cap, |d| d.stack_cap(default_cap));
        let Some(idx) = self.state.combatant(holder).status_index(id) else {
            return Err(EffectError::StatusNotHeld {
                status: id.to_string(),
                side: holder,
            });
        };
        if stacks == 0 {
            self.remove_instance(holder, id, ctx);
            return Ok(());
        }

        let combatant = self.state.combatant_mut(holder);
        let Some(instance) = combatant.status_effects.get_mut(idx) else {
            return Ok(());
        };
        let before = instance.stacks;
        instance.stacks = stacks.min(cap);
        let after = instance.stacks;
        if before != after {
            debug!(%holder, status = id, before, after, "stacks changed");
            self.emit(BattleEvent::StatusStacksChanged {
                side: holder,
                status: id.to_string(),
                before,
                after,
            });
        }
        Ok(())
    }

    /// Fire `remove` triggers, drop the instance, clear stored modifiers
    /// its texts mention.
    fn remove_instance(&mut self, holder: Side, id: &str, ctx: &ExecutionContext) {
        let stacks = self.state.combatant(holder).stacks_of(id);
        let def = self.store.get(id).cloned();
        if let Some(def) = &def {
            self.fire_status_trigger(holder, def, StatusTriggerKind::Remove, stacks, ctx);
        }

        // A remove trigger may already have removed it.
        let combatant = self.state.combatant_mut(holder);
        let Some(idx) = combatant.status_index(id) else {
            return;
        };
        combatant.status_effects.remove(idx);
        if let Some(def) = &def {
            for name in referenced_modifiers(def) {
                if combatant.modifiers.remove(name).is_some() {
                    debug!(%holder, status = id, modifier = name, "stored modifier cleared");
                }
            }
        }
        debug!(%holder, status = id, stacks, "status removed");
        self.emit(BattleEvent::StatusRemoved {
            side: holder,
            status: id.to_string(),
        });
    }

    /// Run one lifecycle trigger of a definition for its holder.
    ///
    /// Failures are logged and swallowed: a broken authored trigger never
    /// interrupts the caller.
    pub(crate) fn fire_status_trigger(
        &mut self,
        holder: Side,
        def: &StatusEffectDefinition,
        kind: StatusTriggerKind,
        stacks: u32,
        ctx: &ExecutionContext,
    ) -> usize {
        self.run_status_texts(holder, def, def.triggers.get(kind).iter(), kind.as_str(), stacks, ctx)
    }

    pub(crate) fn run_status_texts<'a>(
        &mut self,
        holder: Side,
        def: &StatusEffectDefinition,
        texts: impl Iterator<Item = &'a str>,
        trigger: &str,
        stacks: u32,
        ctx: &ExecutionContext,
    ) -> usize {
        let mut fired = 0;
        for text in texts {
            let effect = process_stacks_expression(text, stacks);
            let child = ctx.child().with_trigger(trigger).with_status(StatusContext {
                status_id: def.id.clone(),
                holder,
                stacks,
            });
            debug!(%holder, status = %def.id, trigger, effect = %effect, "status trigger");
            fired += 1;
            if let Err(err) = self.execute_effect_string(&effect, holder.is_player(), child) {
                warn!(%holder, status = %def.id, trigger, error = %err, "status trigger failed");
            }
        }
        fired
    }

    /// Fire `tick` for every status `side` holds.
    pub(crate) fn tick_statuses(&mut self, side: Side, ctx: &ExecutionContext) {
        let held = self.state.combatant(side).status_effects.clone();
        for status in held.iter() {
            // Earlier ticks may have removed or changed it.
            let stacks = self.state.combatant(side).stacks_of(&status.id);
            if stacks == 0 {
                continue;
            }
            if let Some(def) = self.store.get(&status.id).cloned() {
                self.fire_status_trigger(side, &def, StatusTriggerKind::Tick, stacks, ctx);
            }
        }
    }

    /// Apply each held status's `stacks_change`.
    pub(crate) fn decay_statuses(&mut self, side: Side, ctx: &ExecutionContext) {
        let held = self.state.combatant(side).status_effects.clone();
        for status in held.iter() {
            let stacks = self.state.combatant(side).stacks_of(&status.id);
            let Some(change) = self.store.get(&status.id).map(|d| d.stacks_change) else {
                continue;
            };
            if stacks == 0 {
                continue;
            }
            let next = change.apply(stacks);
            if next != stacks {
                if let Err(err) = self.set_stacks_in(side, &status.id, next, ctx) {
                    warn!(%side, status = %status.id, error = %err, "decay failed");
                }
            }
        }
    }

    /// Does any held status's `hold` text contain a `stun` token?
    #[must_use]
    pub fn is_stunned(&self, side: Side) -> bool {
        self.state.combatant(side).status_effects.iter().any(|status| {
            self.store.get(&status.id).is_some_and(|def| {
                def.triggers.hold.iter().any(|text| {
                    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .any(|token| token == "stun")
                })
            })
        })
    }

    /// `status.apply(...)`, `status.remove(...)` and `stacks.<id> op v`.
    pub(crate) fn execute_status_unit(
        &mut self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let id = unit
            .status_id
            .as_deref()
            .ok_or_else(|| EffectError::InvalidValue(unit.raw.clone()))?;
        let explicit = match unit.target {
            Some(Target::All) => return Err(EffectError::UnexpandedAll(unit.raw.clone())),
            Some(Target::Me) => Some(me),
            Some(Target::Op) => Some(me.opponent()),
            None => None,
        };

        match (unit.attribute.as_str(), unit.operator) {
            ("status", Some(Operator::Apply)) => {
                let status_type = self
                    .store
                    .get(id)
                    .map(|def| def.status_type)
                    .ok_or_else(|| EffectError::UnknownStatus(id.to_string()))?;
                let holder = explicit.unwrap_or(if status_type == StatusType::Debuff {
                    me.opponent()
                } else {
                    me
                });
                let stacks = match unit.value {
                    Some(_) => to_stacks(self.resolve_value(unit, me, holder, ctx)?),
                    None => 1,
                };
                if let Some(duration) = unit.duration {
                    debug!(status = id, duration, "status duration is informational");
                }
                self.apply_status_in(holder, id, stacks, ctx)
            }
            ("status", Some(Operator::Remove)) => {
                let holder = explicit.unwrap_or(me);
                let amount = match unit.value {
                    Some(_) => Some(to_stacks(self.resolve_value(unit, me, holder, ctx)?)),
                    None => None,
                };
                self.remove_status_in(holder, id, amount, ctx)
            }
            ("stacks", Some(op)) if op.is_arithmetic() => {
                let holder = explicit.unwrap_or(me);
                let held = self.state.combatant(holder).stacks_of(id);
                let value = self.resolve_value(unit, me, holder, ctx)?;
                let next = op
                    .apply(f64::from(held), value)
                    .map(to_stacks)
                    .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?;
                match (held, next) {
                    (0, 0) => Err(EffectError::StatusNotHeld {
                        status: id.to_string(),
                        side: holder,
                    }),
                    (0, n) => self.apply_status_in(holder, id, n, ctx),
                    (_, n) => self.set_stacks_in(holder, id, n, ctx),
                }
            }
            (attribute, op) => Err(EffectError::UnsupportedOperator {
                attribute: attribute.to_string(),
                op: op.map_or_else(String::new, |op| op.to_string()),
            }),
        }
    }
}

/// Floor a resolved value into a stack count.
fn to_stacks(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Modifier names mentioned by a definition's hold/apply/tick texts.
fn referenced_modifiers(def: &StatusEffectDefinition) -> Vec<&'static str> {
    let texts: Vec<&str> = [
        StatusTriggerKind::Hold,
        StatusTriggerKind::Apply,
        StatusTriggerKind::Tick,
    ]
    .into_iter()
    .flat_map(|kind| def.triggers.get(kind).iter())
    .collect();

    MODIFIER_ATTRIBUTES
        .into_iter()
        .filter(|name| {
            texts.iter().any(|text| {
                text.match_indices(name).any(|(at, _)| {
                    let before = text[..at].chars().next_back();
                    let after = text[at + name.len()..].chars().next();
                    let boundary = |c: Option<char>| !c.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
                    boundary(before) && boundary(after)
                })
            })
        })
        .collect()
}
