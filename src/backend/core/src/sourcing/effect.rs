//! The merge operator for layer effects.
//!
//! An effect is a partial state fragment. Sourcing starts from
//! [`Effect::base`] and folds every layer of an order into it with
//! [`Effect::overlay`], the same way an aggregate folds events.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A partial state fragment that can be layered over an accumulator.
///
/// The reference semantics is shallow key-wise override: keys present in both
/// sides take the layer's value, keys unique to the layer are added. The
/// operator is order-sensitive whenever layers share a key.
pub trait Effect: Clone {
    /// The empty accumulator that sourcing starts from.
    fn base() -> Self;

    /// Merge `layer` into `self`.
    fn overlay(&mut self, layer: &Self);
}

impl<K, V> Effect for HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn base() -> Self {
        HashMap::new()
    }

    fn overlay(&mut self, layer: &Self) {
        for (key, value) in layer {
            self.insert(key.clone(), value.clone());
        }
    }
}

impl<K, V> Effect for BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn base() -> Self {
        BTreeMap::new()
    }

    fn overlay(&mut self, layer: &Self) {
        for (key, value) in layer {
            self.insert(key.clone(), value.clone());
        }
    }
}

impl Effect for serde_json::Map<String, serde_json::Value> {
    fn base() -> Self {
        serde_json::Map::new()
    }

    fn overlay(&mut self, layer: &Self) {
        for (key, value) in layer {
            self.insert(key.clone(), value.clone());
        }
    }
}

/// Objects merge key-wise; any other layer replaces the accumulator.
impl Effect for serde_json::Value {
    fn base() -> Self {
        serde_json::Value::Object(serde_json::Map::new())
    }

    fn overlay(&mut self, layer: &Self) {
        match (self, layer) {
            (serde_json::Value::Object(acc), serde_json::Value::Object(fields)) => {
                acc.overlay(fields);
            }
            (acc, layer) => *acc = layer.clone(),
        }
    }
}
