use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Logical time, in ticks
pub type Tick = i64;

/// Attribute written by the engine with the seed of the last `initialize`
pub const SEED_ATTRIBUTE: &str = "seed";

/// Attribute written by the engine with the node's logical timestamp
pub const TIMESTAMP_ATTRIBUTE: &str = "timestamp";

/// Attribute state of a node
///
/// A thin wrapper around an ordered map of JSON values. Iteration order is
/// the lexical order of the attribute names so anything derived from a
/// state (fingerprints, rule evaluation, display) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeState {
    attributes: BTreeMap<String, Value>,
}

/// An ordered list of attribute writes
pub type StatePatch = Vec<(String, Value)>;

impl NodeState {
    /// Create an empty state
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an attribute value
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Get an attribute as an integer
    #[inline]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Get an attribute as a float
    #[inline]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Get an attribute as a string slice
    #[inline]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Check whether an attribute is present
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Number of attributes
    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the state has no attributes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate attributes in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.attributes.iter()
    }

    /// Write an attribute, returning `true` if the stored value changed
    pub(crate) fn set(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        match self.attributes.get(&key) {
            Some(current) if *current == value => false,
            _ => {
                self.attributes.insert(key, value);
                true
            }
        }
    }

    /// Apply a patch in order, returning the keys whose value changed
    pub(crate) fn apply(&mut self, patch: StatePatch) -> Vec<String> {
        let mut changed = Vec::with_capacity(patch.len());
        for (key, value) in patch {
            if self.set(key.clone(), value) && !changed.contains(&key) {
                changed.push(key);
            }
        }
        changed
    }

    /// Render the state as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a NodeState {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

impl FromIterator<(String, Value)> for NodeState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
