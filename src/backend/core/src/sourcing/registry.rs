//! Layer registry: the fixed mapping from label to effect.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Bound shared by every label type.
///
/// Labels are opaque identifiers; no ordering is assumed.
pub trait Label: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Label for T {}

/// Mapping from label to effect.
///
/// Insertion order is preserved and defines the index space used by
/// exhaustive traversal, so traversal is reproducible for a given registry.
#[derive(Debug, Clone)]
pub struct LayerRegistry<L, E> {
    /// Layers in insertion order
    layers: Vec<(L, E)>,
    /// Map from label to its position in `layers` for O(1) lookup
    index: HashMap<L, usize>,
}

impl<L: Label, E> LayerRegistry<L, E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a layer. Re-inserting a label replaces its effect in place
    /// and returns the previous one.
    pub fn insert(&mut self, label: L, effect: E) -> Option<E> {
        match self.index.get(&label) {
            Some(&position) => Some(std::mem::replace(&mut self.layers[position].1, effect)),
            None => {
                self.index.insert(label.clone(), self.layers.len());
                self.layers.push((label, effect));
                None
            }
        }
    }

    /// Builder-style insert.
    pub fn with_layer(mut self, label: L, effect: E) -> Self {
        self.insert(label, effect);
        self
    }

    /// Get the effect registered for a label.
    pub fn get(&self, label: &L) -> Option<&E> {
        self.index.get(label).map(|&position| &self.layers[position].1)
    }

    /// Check whether a label is registered.
    pub fn contains(&self, label: &L) -> bool {
        self.index.contains_key(label)
    }

    /// Position of a label in insertion order.
    pub fn position(&self, label: &L) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Number of registered layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Iterate over labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.layers.iter().map(|(label, _)| label)
    }

    /// Iterate over `(label, effect)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, &E)> {
        self.layers.iter().map(|(label, effect)| (label, effect))
    }

    pub(crate) fn entry_at(&self, position: usize) -> &(L, E) {
        &self.layers[position]
    }
}

impl<L: Label, E> Default for LayerRegistry<L, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Label, E> FromIterator<(L, E)> for LayerRegistry<L, E> {
    fn from_iter<I: IntoIterator<Item = (L, E)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (label, effect) in iter {
            registry.insert(label, effect);
        }
        registry
    }
}
