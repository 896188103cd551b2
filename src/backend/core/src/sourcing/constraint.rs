//! Constraints that prune the combination and ordering space.
//!
//! A [`Constraint`] judges combinations (unordered subsets of labels) and,
//! optionally, orders. A [`ConstraintSet`] combines constraints by
//! conjunction: a combination is valid iff every constraint admits it.
//!
//! Built-in variants:
//! - [`MutuallyExclusiveConstraint`]: at most one member of a set.
//! - [`OccurrenceConstraint`]: member count within an inclusive range.
//! - [`DependencyConstraint`]: leading labels never follow trailing ones.

use std::collections::HashSet;
use std::fmt::Debug;

use super::registry::{Label, LayerRegistry};
use crate::error::{PatternError, Result};

// =============================================================================
// Constraint Trait
// =============================================================================

/// A predicate over combinations (and optionally orders) of labels.
pub trait Constraint<L>: Debug + Send + Sync {
    /// Name used in logs and violation errors.
    fn name(&self) -> &str;

    /// Every label this constraint refers to. Used to validate the constraint
    /// against a registry at construction time.
    fn labels(&self) -> Vec<&L>;

    /// Judge an unordered combination.
    fn admits_combination(&self, combination: &[L]) -> bool;

    /// Judge a specific order of a combination that was already admitted.
    fn admits_order(&self, _order: &[L]) -> bool {
        true
    }
}

// =============================================================================
// Mutually Exclusive
// =============================================================================

/// Violated iff the combination contains two or more distinct members of the set.
#[derive(Debug, Clone)]
pub struct MutuallyExclusiveConstraint<L> {
    name: String,
    labels: HashSet<L>,
}

impl<L: Label> MutuallyExclusiveConstraint<L> {
    pub fn new(labels: impl IntoIterator<Item = L>) -> Self {
        Self {
            name: "mutually_exclusive".to_string(),
            labels: labels.into_iter().collect(),
        }
    }

    /// Create with a specific name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<L: Label + Send + Sync> Constraint<L> for MutuallyExclusiveConstraint<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> Vec<&L> {
        self.labels.iter().collect()
    }

    fn admits_combination(&self, combination: &[L]) -> bool {
        let mut first: Option<&L> = None;
        for label in combination.iter().filter(|label| self.labels.contains(label)) {
            match first {
                None => first = Some(label),
                Some(seen) if seen != label => return false,
                Some(_) => {}
            }
        }
        true
    }
}

// =============================================================================
// Occurrence
// =============================================================================

/// The number of labels drawn from the set must lie in `min..=max`.
///
/// Repeats count individually, so an order that applies the same label twice
/// counts it twice.
#[derive(Debug, Clone)]
pub struct OccurrenceConstraint<L> {
    name: String,
    labels: HashSet<L>,
    min: usize,
    max: usize,
}

impl<L: Label> OccurrenceConstraint<L> {
    /// Create with explicit inclusive bounds.
    pub fn new(labels: impl IntoIterator<Item = L>, min: usize, max: usize) -> Result<Self> {
        if min > max {
            return Err(PatternError::invalid_constraint(format!(
                "occurrence bounds are inverted: min {} > max {}",
                min, max
            )));
        }

        Ok(Self {
            name: "occurrence".to_string(),
            labels: labels.into_iter().collect(),
            min,
            max,
        })
    }

    /// At most one member of the set (the default bounds `0..=1`).
    pub fn at_most_one(labels: impl IntoIterator<Item = L>) -> Self {
        Self {
            name: "occurrence".to_string(),
            labels: labels.into_iter().collect(),
            min: 0,
            max: 1,
        }
    }

    /// Exactly one member of the set.
    pub fn exactly_one(labels: impl IntoIterator<Item = L>) -> Self {
        Self {
            min: 1,
            ..Self::at_most_one(labels)
        }
    }

    /// Create with a specific name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl<L: Label + Send + Sync> Constraint<L> for OccurrenceConstraint<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> Vec<&L> {
        self.labels.iter().collect()
    }

    fn admits_combination(&self, combination: &[L]) -> bool {
        let occurrences = combination
            .iter()
            .filter(|label| self.labels.contains(label))
            .count();
        (self.min..=self.max).contains(&occurrences)
    }
}

// =============================================================================
// Dependency
// =============================================================================

/// Order-level constraint: no `leading` label may appear after any
/// `trailing` label. Every combination is admitted.
#[derive(Debug, Clone)]
pub struct DependencyConstraint<L> {
    name: String,
    leading: HashSet<L>,
    trailing: HashSet<L>,
}

impl<L: Label> DependencyConstraint<L> {
    /// Fails if the two sets share a label.
    pub fn new(
        leading: impl IntoIterator<Item = L>,
        trailing: impl IntoIterator<Item = L>,
    ) -> Result<Self> {
        let leading: HashSet<L> = leading.into_iter().collect();
        let trailing: HashSet<L> = trailing.into_iter().collect();

        let overlap: Vec<&L> = leading.intersection(&trailing).collect();
        if !overlap.is_empty() {
            return Err(PatternError::invalid_constraint(format!(
                "dependency sets overlap on {:?}",
                overlap
            )));
        }

        Ok(Self {
            name: "dependency".to_string(),
            leading,
            trailing,
        })
    }

    /// Create with a specific name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<L: Label + Send + Sync> Constraint<L> for DependencyConstraint<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> Vec<&L> {
        self.leading.iter().chain(self.trailing.iter()).collect()
    }

    fn admits_combination(&self, _combination: &[L]) -> bool {
        true
    }

    fn admits_order(&self, order: &[L]) -> bool {
        let mut trailing_seen = false;
        for label in order {
            if trailing_seen && self.leading.contains(label) {
                return false;
            }
            if self.trailing.contains(label) {
                trailing_seen = true;
            }
        }
        true
    }
}

// =============================================================================
// Constraint Set
// =============================================================================

/// A conjunction of constraints. Empty means no restriction.
#[derive(Debug)]
pub struct ConstraintSet<L> {
    constraints: Vec<Box<dyn Constraint<L>>>,
}

impl<L: Label> ConstraintSet<L> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Add a constraint.
    pub fn push(&mut self, constraint: impl Constraint<L> + 'static) {
        self.constraints.push(Box::new(constraint));
    }

    /// Builder-style add.
    pub fn with(mut self, constraint: impl Constraint<L> + 'static) -> Self {
        self.push(constraint);
        self
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over the constraints.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Constraint<L>> {
        self.constraints.iter().map(|c| c.as_ref())
    }

    /// Check whether every constraint admits the combination.
    pub fn admits_combination(&self, combination: &[L]) -> bool {
        self.constraints
            .iter()
            .all(|c| c.admits_combination(combination))
    }

    /// Check whether every constraint admits the order.
    pub fn admits_order(&self, order: &[L]) -> bool {
        self.constraints.iter().all(|c| c.admits_order(order))
    }

    /// The first constraint rejecting `order`, judging its labels as a
    /// combination first and as an order second.
    pub fn rejecting(&self, order: &[L]) -> Option<&dyn Constraint<L>> {
        self.iter()
            .find(|c| !c.admits_combination(order))
            .or_else(|| self.iter().find(|c| !c.admits_order(order)))
    }

    /// Fail if any constraint refers to a label outside the registry.
    pub fn validate_against<E>(&self, registry: &LayerRegistry<L, E>) -> Result<()> {
        for constraint in &self.constraints {
            if let Some(label) = constraint
                .labels()
                .into_iter()
                .find(|label| !registry.contains(label))
            {
                return Err(PatternError::unknown_constraint_label(
                    constraint.name(),
                    label,
                ));
            }
        }
        Ok(())
    }
}

impl<L: Label> Default for ConstraintSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Label> FromIterator<Box<dyn Constraint<L>>> for ConstraintSet<L> {
    fn from_iter<I: IntoIterator<Item = Box<dyn Constraint<L>>>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}
