//! Per-call execution context.
//!
//! A context is passed by value into every `execute_effect_string` call.
//! Nested calls get a clone adjusted through the `with_*` builders, so a
//! child never writes trigger or status information back into its parent.

use serde::{Deserialize, Serialize};

use super::expression::Target;
use crate::core::Side;

/// The status whose trigger is currently firing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContext {
    pub status_id: String,
    pub holder: Side,
    /// Stack count substituted into the trigger text.
    pub stacks: u32,
}

/// Call-local fields of one effect execution.
///
/// `source_is_player` is deliberately absent: it is always an explicit
/// argument of the call, never something a context can carry or override.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Fallback target for units that name none.
    pub target_type: Option<Target>,
    /// Lifecycle event that caused this execution.
    pub trigger_type: Option<String>,
    /// Uid of the card being played.
    pub card_context: Option<u32>,
    pub status_context: Option<StatusContext>,
    /// Id of the ability being dispatched.
    pub ability_context: Option<String>,
    pub is_relic_effect: bool,
    pub energy_before_card_play: Option<f64>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target_type = Some(target);
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger_type = Some(trigger.into());
        self
    }

    #[must_use]
    pub fn with_card(mut self, uid: u32) -> Self {
        self.card_context = Some(uid);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusContext) -> Self {
        self.status_context = Some(status);
        self
    }

    #[must_use]
    pub fn with_ability(mut self, id: impl Into<String>) -> Self {
        self.ability_context = Some(id.into());
        self
    }

    #[must_use]
    pub fn relic(mut self) -> Self {
        self.is_relic_effect = true;
        self
    }

    #[must_use]
    pub fn with_energy_before(mut self, energy: f64) -> Self {
        self.energy_before_card_play = Some(energy);
        self
    }

    /// Where this execution came from, for logs and skip events.
    ///
    /// `None` for a plain top-level call.
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        let source = if let Some(status) = &self.status_context {
            Some(format!("status {} ({})", status.status_id, status.holder))
        } else if let Some(id) = &self.ability_context {
            Some(format!("ability {id}"))
        } else if self.is_relic_effect {
            Some("relic".to_string())
        } else {
            self.card_context.map(|uid| format!("card {uid}"))
        };
        match (source, &self.trigger_type) {
            (Some(source), Some(trigger)) => Some(format!("{source} on {trigger}")),
            (source, None) => source,
            (None, Some(trigger)) => Some(trigger.clone()),
        }
    }

    /// Context for a trigger fired from inside this one.
    ///
    /// Keeps the card being played and the pre-play energy, drops every
    /// trigger-scoped field.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            card_context: self.card_context,
            energy_before_card_play: self.energy_before_card_play,
            ..Self::default()
        }
    }
}
