//! Effect Executor.
//!
//! The executor owns one battle's combat state together with the services
//! that interpret effect strings against it: the attribute registry, the
//! parse cache, the status definition store, the event sink and the card
//! chooser. Everything is wired once at construction; there are no globals.
//!
//! ## Batch pipeline
//!
//! 1. parse (cached by raw text), dropping invalid units with a warning
//! 2. expand `ALL` units into a `ME` copy followed by an `OP` copy
//! 3. stable-sort by attribute priority, conditionals last
//! 4. execute sequentially; nested executions run to completion first
//! 5. when the outermost batch ends, resolve pending deaths once
//!
//! Unit errors are logged and emitted as [`BattleEvent::EffectSkipped`];
//! only [`EffectError::NestingLimit`] aborts a batch.

use std::borrow::Cow;

use tracing::{debug, info, warn};

use super::attributes::{AttributeCategory, AttributeRegistry};
use super::context::ExecutionContext;
use super::expression::{EffectExpression, EffectValue, Target};
use super::parser::ParseCache;
use super::variables::VariableScope;
use super::Result;
use crate::cards::{CardChooser, LeftmostChooser};
use crate::core::{BattleConfig, BattleOutcome, CombatState, EffectError, Side, SideMap};
use crate::status::StatusDefinitionStore;
use crate::triggers::event::{BattleEvent, EventSink, TracingSink};

/// Interprets effect strings against one battle's state.
pub struct EffectExecutor {
    pub(crate) state: CombatState,
    pub(crate) store: StatusDefinitionStore,
    pub(crate) registry: AttributeRegistry,
    pub(crate) cache: ParseCache,
    pub(crate) config: BattleConfig,
    pub(crate) sink: Box<dyn EventSink>,
    pub(crate) chooser: Box<dyn CardChooser>,
    /// Current nesting of `execute_effect_string` calls.
    depth: u32,
    /// Sides whose lust overflow is being processed.
    pub(crate) overflowing: SideMap<bool>,
    next_ability_id: u64,
}

impl std::fmt::Debug for EffectExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectExecutor")
            .field("turn", &self.state.turn)
            .field("outcome", &self.state.outcome)
            .field("depth", &self.depth)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl EffectExecutor {
    /// Create an executor with the standard attribute table, a tracing
    /// event sink and the leftmost card chooser.
    #[must_use]
    pub fn new(state: CombatState, store: StatusDefinitionStore, config: BattleConfig) -> Self {
        Self {
            state,
            store,
            registry: AttributeRegistry::standard(),
            cache: ParseCache::new(),
            config,
            sink: Box::new(TracingSink),
            chooser: Box::new(LeftmostChooser),
            depth: 0,
            overflowing: SideMap::default(),
            next_ability_id: 0,
        }
    }

    /// Replace the event sink (builder pattern).
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Replace the card chooser used by `choose[N]` (builder pattern).
    #[must_use]
    pub fn with_chooser(mut self, chooser: impl CardChooser + 'static) -> Self {
        self.chooser = Box::new(chooser);
        self
    }

    /// Replace the attribute registry (builder pattern).
    #[must_use]
    pub fn with_registry(mut self, registry: AttributeRegistry) -> Self {
        self.registry = registry;
        self.cache.clear();
        self
    }

    #[must_use]
    pub fn state(&self) -> &CombatState {
        &self.state
    }

    /// Direct state access for hosts and tests. Mutations made here bypass
    /// triggers and events.
    pub fn state_mut(&mut self) -> &mut CombatState {
        &mut self.state
    }

    #[must_use]
    pub fn store(&self) -> &StatusDefinitionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StatusDefinitionStore {
        &mut self.store
    }

    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Parse cache `(hits, misses)`.
    #[must_use]
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    /// Current nesting depth (0 outside any execution).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Swap the configuration in place for tests that tune limits.
    #[cfg(test)]
    pub(crate) fn with_config(mut self, config: BattleConfig) -> Self {
        self.config = config;
        self
    }

    /// Give back the state and store.
    #[must_use]
    pub fn into_parts(self) -> (CombatState, StatusDefinitionStore) {
        (self.state, self.store)
    }

    pub(crate) fn emit(&mut self, event: BattleEvent) {
        self.sink.emit(&event);
    }

    pub(crate) fn next_ability_id(&mut self) -> String {
        self.next_ability_id += 1;
        format!("ability_{}", self.next_ability_id)
    }

    pub(crate) fn skip(&mut self, raw: &str, reason: impl Into<String>, ctx: &ExecutionContext) {
        let reason = reason.into();
        let origin = ctx.origin();
        warn!(raw, %reason, origin = origin.as_deref().unwrap_or("direct"), "effect unit skipped");
        self.emit(BattleEvent::EffectSkipped {
            raw: raw.to_string(),
            reason,
            origin,
        });
    }

    /// Execute an effect string.
    ///
    /// `source_is_player` decides what `ME` means; it is never taken from
    /// `ctx`. Recoverable unit errors are logged and skipped; the returned
    /// error is always fatal for the batch.
    ///
    /// ```
    /// use card_battle::core::{BattleConfig, CombatState, Combatant, Enemy, Player};
    /// use card_battle::effects::{EffectExecutor, ExecutionContext};
    /// use card_battle::status::StatusDefinitionStore;
    ///
    /// let player = Player::new(Combatant::new("Hero", 50.0, 100.0), 3.0);
    /// let enemy = Enemy::new(Combatant::new("Slime", 30.0, 40.0));
    /// let state = CombatState::new(player, enemy, 1);
    /// let mut exec = EffectExecutor::new(state, StatusDefinitionStore::new(), BattleConfig::new());
    ///
    /// exec.execute_effect_string("OP.hp-6, ME.block+5", true, ExecutionContext::new()).unwrap();
    /// assert_eq!(exec.state().enemy.combatant.current_hp, 24.0);
    /// assert_eq!(exec.state().player.combatant.block, 5.0);
    /// ```
    pub fn execute_effect_string(
        &mut self,
        text: &str,
        source_is_player: bool,
        ctx: ExecutionContext,
    ) -> Result<()> {
        let limit = self.config.max_nesting_depth;
        if self.depth >= limit {
            warn!(depth = self.depth, effect = text, "effect nesting limit reached");
            return Err(EffectError::NestingLimit(limit));
        }
        if self.depth == 0 {
            self.state.pending_death.clear();
        }

        self.depth += 1;
        let result = self.run_batch(text, Side::from_is_player(source_is_player), &ctx);
        self.depth -= 1;

        if self.depth == 0 {
            self.resolve_pending_death();
        }
        result
    }

    fn run_batch(&mut self, text: &str, me: Side, ctx: &ExecutionContext) -> Result<()> {
        let units = self.cache.parse(text, &self.registry);
        debug!(effect = text, units = units.len(), side = %me, "executing effect string");

        let mut plan: Vec<Cow<'_, EffectExpression>> = Vec::with_capacity(units.len());
        for unit in units.iter() {
            if !unit.is_valid {
                let reason = unit.error_message.as_deref().unwrap_or("invalid syntax");
                self.skip(&unit.raw, reason, ctx);
                continue;
            }
            if unit.target == Some(Target::All) {
                plan.push(Cow::Owned(unit.retargeted(Target::Me)));
                plan.push(Cow::Owned(unit.retargeted(Target::Op)));
            } else {
                plan.push(Cow::Borrowed(unit));
            }
        }
        let registry = &self.registry;
        plan.sort_by_key(|unit| registry.priority_of(unit));

        for unit in &plan {
            match self.execute_unit(unit, me, ctx) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    warn!(raw = %unit.raw, error = %err, "aborting effect batch");
                    return Err(err);
                }
                Err(err) => self.skip(&unit.raw, err.to_string(), ctx),
            }
        }
        Ok(())
    }

    fn execute_unit(&mut self, unit: &EffectExpression, me: Side, ctx: &ExecutionContext) -> Result<()> {
        if unit.is_conditional() {
            return self.execute_conditional(unit, me, ctx);
        }
        let category = self
            .registry
            .get(&unit.attribute)
            .map(|def| def.category)
            .ok_or_else(|| EffectError::UnknownAttribute(unit.attribute.clone()))?;

        match category {
            AttributeCategory::Basic => self.execute_basic(unit, me, ctx),
            AttributeCategory::Modifier => self.execute_modifier(unit, me, ctx),
            AttributeCategory::Status => self.execute_status_unit(unit, me, ctx),
            AttributeCategory::Ability => self.execute_ability_unit(unit, me, ctx),
            AttributeCategory::Card => self.execute_card_unit(unit, me, ctx),
            // `passive(...)` is only read by the modifier resolver.
            AttributeCategory::Special => Ok(()),
        }
    }

    /// Resolve the side a unit acts on.
    pub(crate) fn resolve_target(
        &self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<Side> {
        if unit.target == Some(Target::All) {
            return Err(EffectError::UnexpandedAll(unit.raw.clone()));
        }
        if AttributeRegistry::is_player_only(&unit.attribute) {
            return Ok(Side::Player);
        }
        match unit.target.or(ctx.target_type) {
            Some(Target::Me) => Ok(me),
            Some(Target::Op) => Ok(me.opponent()),
            _ => Err(EffectError::MissingTarget(unit.attribute.clone())),
        }
    }

    /// Variable scope for a unit invoked by `me` acting on `target`.
    pub(crate) fn scope(&self, me: Side, target: Side, ctx: &ExecutionContext) -> VariableScope<'_> {
        VariableScope::new(&self.state, &self.store, me)
            .reading(target)
            .with_energy_before(ctx.energy_before_card_play)
    }

    /// Numeric value of a unit, read against live state.
    pub(crate) fn resolve_value(
        &self,
        unit: &EffectExpression,
        me: Side,
        target: Side,
        ctx: &ExecutionContext,
    ) -> Result<f64> {
        let scope = self.scope(me, target, ctx);
        match &unit.value {
            Some(EffectValue::Literal(n)) => Ok(*n),
            Some(EffectValue::VariableRef(path)) => scope
                .resolve_path(path)
                .ok_or_else(|| EffectError::InvalidValue(path.clone())),
            Some(EffectValue::Expression(text)) => Ok(scope.evaluate(text)),
            Some(EffectValue::Text(text)) => Err(EffectError::InvalidValue(text.clone())),
            None => Err(EffectError::InvalidValue(unit.raw.clone())),
        }
    }

    fn execute_conditional(
        &mut self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let condition = unit.condition.as_deref().unwrap_or_default();
        let holds = self.scope(me, me, ctx).condition(condition);
        debug!(condition, holds, "conditional evaluated");

        let branch = if holds {
            unit.true_effect.as_deref()
        } else {
            unit.false_effect.as_deref()
        };
        match branch {
            Some(effect) if !effect.trim().is_empty() => {
                self.execute_effect_string(effect, me.is_player(), ctx.clone())
            }
            _ => Ok(()),
        }
    }

    /// `X.<type>_modifier op value` edits the directly stored modifier.
    fn execute_modifier(
        &mut self,
        unit: &EffectExpression,
        me: Side,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let target = self.resolve_target(unit, me, ctx)?;
        let op = unit.operator.ok_or_else(|| EffectError::InvalidValue(unit.raw.clone()))?;
        let value = self.resolve_value(unit, me, target, ctx)?;

        let modifiers = &mut self.state.combatant_mut(target).modifiers;
        let before = modifiers.get(&unit.attribute).copied().unwrap_or(0.0);
        let after = op
            .apply(before, value)
            .ok_or_else(|| EffectError::InvalidValue(format!("{op}{value}")))?;
        modifiers.insert(unit.attribute.clone(), after);

        debug!(side = %target, attribute = %unit.attribute, before, after, "modifier stored");
        self.emit(BattleEvent::AttributeChanged {
            side: target,
            attribute: unit.attribute.clone(),
            before,
            after,
        });
        Ok(())
    }

    /// Settle deaths marked during the outermost batch.
    ///
    /// When both sides died in the same batch the player wins.
    fn resolve_pending_death(&mut self) {
        if self.state.is_over() {
            self.state.pending_death.clear();
            return;
        }
        let dead = |side: Side| {
            self.state.pending_death[side] || self.state.combatant(side).is_dead()
        };
        let winner = if dead(Side::Enemy) {
            Side::Player
        } else if dead(Side::Player) {
            Side::Enemy
        } else {
            return;
        };

        self.state.pending_death.clear();
        self.state.outcome = Some(BattleOutcome::for_winner(winner));
        info!(%winner, turn = self.state.turn, "battle decided");
        self.emit(BattleEvent::GameOver { winner });
    }

    /// Mark `side` dead if its hp reached 0.
    pub(crate) fn check_death(&mut self, side: Side) {
        if self.state.combatant(side).is_dead() && !self.state.pending_death[side] {
            debug!(%side, "pending death");
            self.state.pending_death[side] = true;
        }
    }
}
