//! Status Definition Store.
//!
//! Holds every status definition known to the battle, keyed by id, in
//! insertion order. Definitions arrive from the host's variable store as a
//! JSON array which may be wrapped in up to three levels of extra arrays;
//! the loader unwraps them and skips malformed entries instead of failing.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::definition::{StatusEffectDefinition, StatusSource};

/// How many levels of nested arrays the loader unwraps.
const MAX_UNWRAP_DEPTH: usize = 3;

/// Registry of status definitions.
///
/// ## Example
///
/// ```
/// use card_battle::status::{StatusDefinitionStore, StatusEffectDefinition, StatusType};
///
/// let mut store = StatusDefinitionStore::new();
/// store.define(StatusEffectDefinition::new("burn", "Burn", StatusType::Debuff));
///
/// assert!(store.contains("burn"));
/// assert_eq!(store.get("burn").unwrap().name, "Burn");
/// ```
#[derive(Clone, Debug, Default)]
pub struct StatusDefinitionStore {
    definitions: FxHashMap<String, StatusEffectDefinition>,
    order: Vec<String>,
}

impl StatusDefinitionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition. Returns the replaced one, if any.
    pub fn define(&mut self, def: StatusEffectDefinition) -> Option<StatusEffectDefinition> {
        let id = def.id.clone();
        let previous = self.definitions.insert(id.clone(), def);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    /// Register a definition authored at runtime by the generative backend.
    pub fn define_ai(&mut self, mut def: StatusEffectDefinition, created_at: u64) {
        def.source = StatusSource::Ai;
        def.created_at = created_at;
        debug!(status = %def.id, "registered AI status definition");
        self.define(def);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StatusEffectDefinition> {
        self.definitions.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Remove a definition.
    pub fn remove(&mut self, id: &str) -> Option<StatusEffectDefinition> {
        let removed = self.definitions.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterate definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StatusEffectDefinition> {
        self.order.iter().filter_map(|id| self.definitions.get(id))
    }

    /// Load definitions from the host's persisted JSON value.
    ///
    /// Returns the number of definitions loaded. Entries that are not
    /// valid definitions are logged and skipped.
    pub fn load_value(&mut self, value: &Value) -> usize {
        let mut loaded = 0;
        for entry in flatten_entries(value) {
            match serde_json::from_value::<StatusEffectDefinition>(entry.clone()) {
                Ok(def) => {
                    self.define(def);
                    loaded += 1;
                }
                Err(e) => warn!(error = %e, "skipping malformed status definition"),
            }
        }
        debug!(loaded, total = self.len(), "loaded status definitions");
        loaded
    }

    /// Load definitions from a JSON string.
    pub fn load_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Ok(self.load_value(&value))
    }

    /// Serialize every definition as a flat JSON array, for write-back.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let defs: Vec<&StatusEffectDefinition> = self.iter().collect();
        serde_json::to_value(defs)
    }
}

/// Collect the object entries of a possibly nested array.
fn flatten_entries(value: &Value) -> Vec<&Value> {
    fn walk<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a Value>) {
        match value {
            Value::Array(items) if depth <= MAX_UNWRAP_DEPTH => {
                for item in items {
                    walk(item, depth + 1, out);
                }
            }
            Value::Object(_) => out.push(value),
            Value::Null => {}
            other => warn!(
                kind = %value_kind(other),
                depth,
                "ignoring non-object status definition entry"
            ),
        }
    }

    let mut out = Vec::new();
    walk(value, 0, &mut out);
    out
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::definition::StatusType;

    #[test]
    fn test_define_and_replace() {
        let mut store = StatusDefinitionStore::new();
        assert!(store
            .define(StatusEffectDefinition::new("burn", "Burn", StatusType::Debuff))
            .is_none());
        let replaced = store.define(StatusEffectDefinition::new("burn", "Blaze", StatusType::Debuff));

        assert_eq!(replaced.unwrap().name, "Burn");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("burn").unwrap().name, "Blaze");
    }

    #[test]
    fn test_iteration_order() {
        let mut store = StatusDefinitionStore::new();
        for id in ["c", "a", "b"] {
            store.define(StatusEffectDefinition::new(id, id, StatusType::Neutral));
        }
        let ids: Vec<_> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        store.remove("a");
        let ids: Vec<_> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_load_nested_arrays() {
        let json = r#"[[[{"id":"a","name":"A"}], {"id":"b","name":"B"}], {"id":"c","name":"C"}]"#;
        let mut store = StatusDefinitionStore::new();
        assert_eq!(store.load_json(json).unwrap(), 3);
        assert!(store.contains("a") && store.contains("b") && store.contains("c"));
    }

    #[test]
    fn test_load_too_deep_is_skipped() {
        let json = r#"[[[[[{"id":"deep","name":"Deep"}]]]]]"#;
        let mut store = StatusDefinitionStore::new();
        assert_eq!(store.load_json(json).unwrap(), 0);
    }

    #[test]
    fn test_load_skips_malformed() {
        let json = r#"[{"id":"ok","name":"Ok"}, {"name":"no id"}, 5, null]"#;
        let mut store = StatusDefinitionStore::new();
        assert_eq!(store.load_json(json).unwrap(), 1);
    }

    #[test]
    fn test_define_ai_marks_source() {
        let mut store = StatusDefinitionStore::new();
        store.define_ai(StatusEffectDefinition::new("x", "X", StatusType::Buff), 123);
        let def = store.get("x").unwrap();
        assert_eq!(def.source, StatusSource::Ai);
        assert_eq!(def.created_at, 123);
    }

    #[test]
    fn test_to_value_roundtrip() {
        let mut store = StatusDefinitionStore::new();
        store.define(StatusEffectDefinition::new("x", "X", StatusType::Buff).with_max_stacks(3));
        let value = store.to_value().unwrap();

        let mut reloaded = StatusDefinitionStore::new();
        assert_eq!(reloaded.load_value(&value), 1);
        assert_eq!(reloaded.get("x").unwrap().max_stacks, Some(3));
    }
}
