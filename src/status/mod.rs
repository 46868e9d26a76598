//! Status effects: definitions, held instances and their lifecycle.
//!
//! ## Key Types
//!
//! - `StatusEffectDefinition`: Authored status with decay rule, cap and triggers
//! - `StatusEffectInstance`: A status held by a combatant, with its stacks
//! - `StatusDefinitionStore`: Definitions keyed by id, loaded from host JSON
//!
//! The lifecycle itself (apply, re-apply, tick, decay, removal) runs on the
//! effect executor, see `lifecycle`.

pub mod definition;
pub mod instance;
pub mod lifecycle;
pub mod store;

pub use definition::{
    StacksChange, StatusEffectDefinition, StatusSource, StatusTriggerKind, StatusTriggers,
    StatusType, TriggerEffects,
};
pub use instance::StatusEffectInstance;
pub use store::StatusDefinitionStore;
