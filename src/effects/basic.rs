//! Numeric attribute effects: hp, lust, block, energy and the max stats.
//!
//! Every mutation clamps, rounds to one decimal and only then commits, so
//! the combatant invariants hold between any two units. Triggers fired by
//! a change run after the value is committed.

use tracing::{debug, info, warn};

use super::context::ExecutionContext;
use super::executor::EffectExecutor;
use super::expression::{EffectExpression, Operator};
use super::modifiers::{resolve_modifier, ModifierType};
use super::Result;
use crate::core::{round1, EffectError, Side};
use crate::triggers::ability::TriggerKind;
use crate::triggers::event::BattleEvent;

impl EffectExecutor {
    pub(crate) fn execute_basic(
        &mut self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let target = self.resolve_target(unit, me, ctx)?;
        let op = unit
            .operator
            .filter(|op| op.is_arithmetic())
            .ok_or_else(|| EffectError::UnsupportedOperator {
                attribute: unit.attribute.clone(),
                op: unit.operator.map_or_else(String::new, |op| op.to_string()),
            })?;
        let value = finite(self.resolve_value(unit, me, target, ctx)?)?;

        match unit.attribute.as_str() {
            "hp" => self.change_hp(me, target, op, value, ctx),
            "lust" => self.change_lust(me, target, op, value, ctx),
            "block" => self.change_block(target, op, value, ctx),
            "energy" => self.change_energy(op, value),
            "max_hp" | "max_lust" | "max_energy" => self.change_max(target, &unit.attribute, op, value),
            other => Err(EffectError::UnknownAttribute(other.to_string())),
        }
    }

    fn modifier(&self, side: Side, ty: ModifierType) -> super::modifiers::ModifierBreakdown {
        resolve_modifier(&self.state, &self.store, side, ty)
    }

    fn attribute_changed(&mut self, side: Side, attribute: &str, before: f64, after: f64) {
        if before == after {
            return;
        }
        debug!(%side, attribute, before, after, "attribute changed");
        self.emit(BattleEvent::AttributeChanged {
            side,
            attribute: attribute.to_string(),
            before,
            after,
        });
    }

    fn change_hp(
        &mut self,
        source: Side,
        target: Side,
        op: Operator,
        value: f64,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        match op {
            Operator::Decrease if value > 0.0 => {
                let raw = self.modifier(source, ModifierType::Damage).apply(value);
                let amount = self.modifier(target, ModifierType::DamageTaken).apply(raw).max(0.0);
                let amount = finite(amount)?;
                self.deal_damage(source, target, amount, ctx);
                Ok(())
            }
            Operator::Increase if value > 0.0 => {
                self.heal(target, value, ctx);
                Ok(())
            }
            _ => {
                let before = self.state.combatant(target).current_hp;
                let next = op
                    .apply(before, value)
                    .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?;
                let after = self.commit_hp(target, next);
                if after < before {
                    self.emit(BattleEvent::Damaged {
                        side: target,
                        amount: round1(before - after),
                        blocked: 0.0,
                    });
                    self.dispatch(target, TriggerKind::TakeDamage, ctx);
                } else if after > before {
                    self.emit(BattleEvent::Healed {
                        side: target,
                        amount: round1(after - before),
                    });
                    self.dispatch(target, TriggerKind::TakeHeal, ctx);
                }
                Ok(())
            }
        }
    }

    /// Clamp and store hp; returns the stored value.
    fn commit_hp(&mut self, side: Side, next: f64) -> f64 {
        let c = self.state.combatant_mut(side);
        let before = c.current_hp;
        if next.is_nan() {
            warn!(%side, "hp change is not a number; ignored");
            return before;
        }
        c.current_hp = round1(next.clamp(0.0, c.max_hp));
        let after = c.current_hp;
        self.attribute_changed(side, "hp", before, after);
        self.check_death(side);
        after
    }

    /// Apply already-modified damage: block absorbs first, the rest hits hp.
    pub(crate) fn deal_damage(&mut self, source: Side, target: Side, amount: f64, ctx: &ExecutionContext) {
        if !amount.is_finite() {
            warn!(%source, %target, amount, "non-finite damage ignored");
            return;
        }
        let c = self.state.combatant_mut(target);
        let block_before = c.block;
        let used = block_before.min(amount);
        let remaining = amount - used;
        c.block = round1((block_before - used).max(0.0));
        let block_after = c.block;
        let hp_before = c.current_hp;

        self.attribute_changed(target, "block", block_before, block_after);
        let hp_after = self.commit_hp(target, hp_before - remaining);
        let lost = round1(hp_before - hp_after);

        debug!(%source, %target, amount, blocked = used, lost, "damage dealt");
        self.emit(BattleEvent::Damaged {
            side: target,
            amount: lost,
            blocked: round1(used),
        });

        if used > 0.0 {
            self.dispatch(target, TriggerKind::LoseBlock, ctx);
        }
        if lost > 0.0 {
            self.dispatch(target, TriggerKind::TakeDamage, ctx);
        }
        if source != target && amount > 0.0 {
            self.dispatch(source, TriggerKind::DealDamage, ctx);
        }
    }

    fn heal(&mut self, target: Side, amount: f64, ctx: &ExecutionContext) {
        let before = self.state.combatant(target).current_hp;
        let after = self.commit_hp(target, before + amount);
        let healed = round1(after - before);
        if healed > 0.0 {
            self.emit(BattleEvent::Healed {
                side: target,
                amount: healed,
            });
            self.dispatch(target, TriggerKind::TakeHeal, ctx);
        }
    }

    fn change_lust(
        &mut self,
        source: Side,
        target: Side,
        op: Operator,
        value: f64,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let before = self.state.combatant(target).current_lust;
        let next = if op == Operator::Increase && value > 0.0 {
            let raw = self.modifier(source, ModifierType::LustDamage).apply(value);
            let amount = self
                .modifier(target, ModifierType::LustDamageTaken)
                .apply(raw)
                .max(0.0);
            before + amount
        } else {
            op.apply(before, value)
                .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?
        };
        let next = finite(next)?;

        let c = self.state.combatant_mut(target);
        c.current_lust = round1(next.clamp(0.0, c.max_lust));
        let after = c.current_lust;
        let reached_max = after >= c.max_lust;
        self.attribute_changed(target, "lust", before, after);

        if after > before {
            self.dispatch(target, TriggerKind::LustIncrease, ctx);
        }
        // A lust_increase trigger may already have overflowed and reset.
        let c = self.state.combatant(target);
        if reached_max && c.current_lust >= c.max_lust {
            self.lust_overflow(target, ctx);
        }
        Ok(())
    }

    /// `side` reached max lust: run the opponent's overflow effect, fire
    /// `lust_overflow`, reset lust to 0. Re-entrant overflow of the same
    /// side is ignored.
    fn lust_overflow(&mut self, side: Side, ctx: &ExecutionContext) {
        if self.overflowing[side] {
            return;
        }
        self.overflowing[side] = true;
        info!(%side, "lust overflow");
        self.emit(BattleEvent::LustOverflow { side });

        let opponent = side.opponent();
        if let Some(effect) = self.state.combatant(opponent).overflow_effect.clone() {
            let child = ctx.child().with_trigger(TriggerKind::LustOverflow.as_str());
            if let Err(err) = self.execute_effect_string(&effect, opponent.is_player(), child) {
                warn!(%side, error = %err, "overflow effect failed");
            }
        }
        self.dispatch(side, TriggerKind::LustOverflow, ctx);

        let c = self.state.combatant_mut(side);
        let before = c.current_lust;
        c.current_lust = 0.0;
        self.attribute_changed(side, "lust", before, 0.0);
        self.overflowing[side] = false;
    }

    fn change_block(&mut self, target: Side, op: Operator, value: f64, ctx: &ExecutionContext) -> Result<()> {
        let before = self.state.combatant(target).block;
        let next = if op == Operator::Increase && value > 0.0 {
            before + self.modifier(target, ModifierType::Block).apply(value).max(0.0)
        } else {
            op.apply(before, value)
                .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?
        };
        let next = finite(next)?;

        let c = self.state.combatant_mut(target);
        c.block = round1(next.max(0.0));
        let after = c.block;
        self.attribute_changed(target, "block", before, after);

        if after > before {
            self.dispatch(target, TriggerKind::GainBlock, ctx);
        } else if after < before {
            self.dispatch(target, TriggerKind::LoseBlock, ctx);
        }
        Ok(())
    }

    fn change_energy(&mut self, op: Operator, value: f64) -> Result<()> {
        let before = self.state.player.energy;
        let next = op
            .apply(before, value)
            .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?;
        self.state.player.energy = round1(next.max(0.0));
        let after = self.state.player.energy;
        self.attribute_changed(Side::Player, "energy", before, after);
        Ok(())
    }

    /// Max stats never drop below 1; lowering one clamps its current value.
    fn change_max(&mut self, target: Side, attribute: &str, op: Operator, value: f64) -> Result<()> {
        let slot = match attribute {
            "max_hp" => &mut self.state.combatant_mut(target).max_hp,
            "max_lust" => &mut self.state.combatant_mut(target).max_lust,
            _ => &mut self.state.player.max_energy,
        };
        let before = *slot;
        let next = op
            .apply(before, value)
            .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?;
        *slot = round1(next.max(1.0));
        let after = *slot;

        let side = if attribute == "max_energy" { Side::Player } else { target };
        self.attribute_changed(side, attribute, before, after);

        if attribute != "max_energy" {
            let c = self.state.combatant_mut(target);
            let (hp, lust) = (c.current_hp, c.current_lust);
            c.clamp_stats();
            let (hp_after, lust_after) = (c.current_hp, c.current_lust);
            self.attribute_changed(target, "hp", hp, hp_after);
            self.attribute_changed(target, "lust", lust, lust_after);
        }
        Ok(())
    }
}

/// Non-finite numbers never reach a stored stat.
fn finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EffectError::InvalidValue(value.to_string()))
    }
}
