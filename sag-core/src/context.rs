//! Evaluation context contract

use crate::Value;
use serde::{Deserialize, Serialize};

/// Dotted-path lookup over a value tree.
///
/// Paths are dot-segmented; intermediate segments must resolve to objects or
/// the lookup yields nothing.
pub trait Context {
    fn get(&self, path: &str) -> Option<Value>;

    fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    fn set(&mut self, path: &str, value: Value);

    /// Snapshot of the top-level entries in insertion order.
    fn as_map(&self) -> Vec<(String, Value)>;
}

/// In-memory `Context` backed by an ordered key/value tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapContext {
    entries: Vec<(String, Value)>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        Self { entries: pairs }
    }
}

impl Context for MapContext {
    fn get(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return None;
        }
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self
            .entries
            .iter()
            .find(|(k, _)| k == first)
            .map(|(_, v)| v)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    fn set(&mut self, path: &str, value: Value) {
        if path.is_empty() {
            return;
        }
        let segments: Vec<&str> = path.split('.').collect();
        set_in(&mut self.entries, &segments, value);
    }

    fn as_map(&self) -> Vec<(String, Value)> {
        self.entries.clone()
    }
}

fn set_in(entries: &mut Vec<(String, Value)>, segments: &[&str], value: Value) {
    let key = segments[0];
    if segments.len() == 1 {
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key.to_string(), value)),
        }
        return;
    }

    let idx = match entries.iter().position(|(k, _)| k == key) {
        Some(i) => {
            // A non-object intermediate is replaced by an object.
            if !matches!(entries[i].1, Value::Object(_)) {
                entries[i].1 = Value::Object(Vec::new());
            }
            i
        }
        None => {
            entries.push((key.to_string(), Value::Object(Vec::new())));
            entries.len() - 1
        }
    };
    if let Value::Object(children) = &mut entries[idx].1 {
        set_in(children, &segments[1..], value);
    }
}
