//! Event sourcer: builds state by folding labeled layers in a caller-chosen
//! order, and enumerates every constraint-valid order.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use lazy_pattern_core::sourcing::{EventSourcer, LayerRegistry};
//!
//! let registry = LayerRegistry::new()
//!     .with_layer("ice", HashMap::from([("ice", "more")]))
//!     .with_layer("sugar", HashMap::from([("sugar", "full")]));
//! let sourcer = EventSourcer::new(registry).unwrap();
//!
//! let merged = sourcer.source(&["sugar", "ice"]).unwrap();
//! assert_eq!(merged.len(), 2);
//! assert_eq!(sourcer.exhaustive().count(), 5);
//! ```

use std::collections::HashMap;

use metrics::counter;
use tracing::{debug, trace};

use super::constraint::ConstraintSet;
use super::effect::Effect;
use super::registry::{Label, LayerRegistry};
use crate::error::{PatternError, Result};

/// Worst-case number of orderings over `n` labels: `Σ C(n,k)·k!` for
/// `k = 0..=n`. Saturates at `u128::MAX`.
pub fn ordering_bound(n: usize) -> u128 {
    let mut total: u128 = 1;
    let mut term: u128 = 1;

    for k in 1..=n {
        term = match term.checked_mul((n - k + 1) as u128) {
            Some(term) => term,
            None => return u128::MAX,
        };
        total = match total.checked_add(term) {
            Some(total) => total,
            None => return u128::MAX,
        };
    }

    total
}

/// A named order stored on the sourcer, kept with its registry positions.
#[derive(Debug, Clone)]
struct RegisteredOrder<L> {
    name: String,
    labels: Vec<L>,
    positions: Vec<usize>,
}

/// Sources state from a fixed layer registry.
#[derive(Debug)]
pub struct EventSourcer<L, E> {
    registry: LayerRegistry<L, E>,
    constraints: ConstraintSet<L>,
    orders: Vec<RegisteredOrder<L>>,
    order_index: HashMap<String, usize>,
}

impl<L: Label, E: Effect> EventSourcer<L, E> {
    /// Create a sourcer with no constraints.
    pub fn new(registry: LayerRegistry<L, E>) -> Result<Self> {
        Self::with_constraints(registry, ConstraintSet::new())
    }

    /// Create a sourcer whose exhaustive traversal is pruned by `constraints`.
    ///
    /// Fails if a constraint names a label outside the registry.
    pub fn with_constraints(
        registry: LayerRegistry<L, E>,
        constraints: ConstraintSet<L>,
    ) -> Result<Self> {
        constraints.validate_against(&registry)?;

        debug!(
            layers = registry.len(),
            constraints = constraints.len(),
            "Event sourcer created"
        );

        Ok(Self {
            registry,
            constraints,
            orders: Vec::new(),
            order_index: HashMap::new(),
        })
    }

    /// Merge the effects of `order` onto the base state.
    ///
    /// Duplicates re-apply their effect. Constraints are not consulted.
    pub fn source(&self, order: &[L]) -> Result<E> {
        let positions = self.resolve(order)?;
        Ok(self.fold(&positions))
    }

    /// Lazily enumerate every valid `(order, merged)` pair.
    ///
    /// Combinations are visited by size, then in lexicographic registry-index
    /// order; each admitted combination yields its lexicographic permutations.
    /// Every call starts a fresh traversal.
    pub fn exhaustive(&self) -> Exhaustive<'_, L, E> {
        Exhaustive::new(self)
    }

    /// Worst-case ordering count for this registry.
    pub fn ordering_bound(&self) -> u128 {
        ordering_bound(self.registry.len())
    }

    /// Verify that every label is known and that no constraint rejects the order.
    pub fn check(&self, order: &[L]) -> Result<()> {
        self.resolve(order)?;

        match self.constraints.rejecting(order) {
            Some(constraint) => Err(PatternError::constraint_violation(constraint.name(), order)),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Registered Orders
    // =========================================================================

    /// Store a named order. The order is checked first; re-registering a
    /// name replaces the earlier order but keeps its position.
    pub fn register(&mut self, name: impl Into<String>, order: impl Into<Vec<L>>) -> Result<()> {
        let name = name.into();
        let labels = order.into();

        self.check(&labels)?;
        let positions = self.resolve(&labels)?;

        debug!(order = %name, length = labels.len(), "Order registered");

        let entry = RegisteredOrder {
            name: name.clone(),
            labels,
            positions,
        };

        match self.order_index.get(&name) {
            Some(&index) => self.orders[index] = entry,
            None => {
                self.order_index.insert(name, self.orders.len());
                self.orders.push(entry);
            }
        }

        Ok(())
    }

    /// Get a registered order by name.
    pub fn order(&self, name: &str) -> Option<&[L]> {
        self.order_index
            .get(name)
            .map(|&index| self.orders[index].labels.as_slice())
    }

    /// Merge a registered order.
    pub fn source_registered(&self, name: &str) -> Result<E> {
        let index = self
            .order_index
            .get(name)
            .ok_or_else(|| PatternError::unknown_order(name))?;
        Ok(self.fold(&self.orders[*index].positions))
    }

    /// Iterate `(name, merged)` over registered orders in registration order.
    pub fn registered(&self) -> impl Iterator<Item = (&str, E)> + '_ {
        self.orders
            .iter()
            .map(|order| (order.name.as_str(), self.fold(&order.positions)))
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn registry(&self) -> &LayerRegistry<L, E> {
        &self.registry
    }

    pub fn constraints(&self) -> &ConstraintSet<L> {
        &self.constraints
    }

    /// Effect registered for a label.
    pub fn get(&self, label: &L) -> Option<&E> {
        self.registry.get(label)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn resolve(&self, order: &[L]) -> Result<Vec<usize>> {
        order
            .iter()
            .map(|label| {
                self.registry
                    .position(label)
                    .ok_or_else(|| PatternError::unknown_label(label))
            })
            .collect()
    }

    fn fold(&self, positions: &[usize]) -> E {
        positions.iter().fold(E::base(), |mut merged, &position| {
            merged.overlay(&self.registry.entry_at(position).1);
            merged
        })
    }
}

// =============================================================================
// Exhaustive Traversal
// =============================================================================

/// Iterator over every constraint-valid ordering of a sourcer's labels.
///
/// Holds only index vectors; orders and merged effects are built on demand.
pub struct Exhaustive<'a, L, E> {
    sourcer: &'a EventSourcer<L, E>,
    /// Current combination as ascending registry indices
    combination: Vec<usize>,
    /// Next permutation of `combination` to try, if any remain
    permutation: Option<Vec<usize>>,
    started: bool,
    finished: bool,
}

impl<'a, L: Label, E: Effect> Exhaustive<'a, L, E> {
    fn new(sourcer: &'a EventSourcer<L, E>) -> Self {
        Self {
            sourcer,
            combination: Vec::new(),
            permutation: None,
            started: false,
            finished: false,
        }
    }

    fn labels_at(&self, indices: &[usize]) -> Vec<L> {
        indices
            .iter()
            .map(|&index| self.sourcer.registry.entry_at(index).0.clone())
            .collect()
    }

    /// Move to the next combination, growing the size when the current one
    /// is exhausted. Returns false once the power set is done.
    fn advance_combination(&mut self) -> bool {
        let n = self.sourcer.registry.len();

        if !self.started {
            self.started = true;
            return true;
        }

        if next_combination(&mut self.combination, n) {
            return true;
        }

        let size = self.combination.len() + 1;
        if size > n {
            return false;
        }
        self.combination = (0..size).collect();
        true
    }
}

impl<'a, L: Label, E: Effect> Iterator for Exhaustive<'a, L, E> {
    type Item = (Vec<L>, E);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(permutation) = self.permutation.as_mut() {
                let candidate = permutation.clone();
                if !next_permutation(permutation) {
                    self.permutation = None;
                }

                let order = self.labels_at(&candidate);
                if !self.sourcer.constraints.admits_order(&order) {
                    continue;
                }

                trace!(order = ?order, "Ordering yielded");
                counter!("lazy_pattern_sourcer_orderings_total").increment(1);

                let merged = self.sourcer.fold(&candidate);
                return Some((order, merged));
            }

            if !self.advance_combination() {
                self.finished = true;
                continue;
            }

            let combination = self.labels_at(&self.combination);
            if self.sourcer.constraints.admits_combination(&combination) {
                self.permutation = Some(self.combination.clone());
            }
        }
    }
}

/// Advance `indices` (ascending, drawn from `0..n`) to the next k-combination
/// in lexicographic order.
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();

    for i in (0..k).rev() {
        if indices[i] < n - k + i {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }

    false
}

/// Rearrange `items` into the next lexicographic permutation.
fn next_permutation(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }

    let Some(pivot) = (0..items.len() - 1).rev().find(|&i| items[i] < items[i + 1]) else {
        return false;
    };

    let successor = (pivot + 1..items.len())
        .rev()
        .find(|&j| items[j] > items[pivot])
        .unwrap_or(pivot + 1);

    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::sourcing::constraint::{DependencyConstraint, MutuallyExclusiveConstraint};
    use std::collections::{BTreeMap, HashSet};

    type Layers = BTreeMap<&'static str, &'static str>;

    fn drinks() -> LayerRegistry<&'static str, Layers> {
        LayerRegistry::new()
            .with_layer("ICE", BTreeMap::from([("ice", "more")]))
            .with_layer("SUGAR", BTreeMap::from([("sugar", "full")]))
            .with_layer("LESS_ICE", BTreeMap::from([("ice", "less")]))
    }

    #[test]
    fn test_ordering_bound() {
        assert_eq!(ordering_bound(0), 1);
        assert_eq!(ordering_bound(1), 2);
        assert_eq!(ordering_bound(2), 5);
        assert_eq!(ordering_bound(3), 16);
        assert_eq!(ordering_bound(4), 65);
        assert_eq!(ordering_bound(200), u128::MAX);
    }

    #[test]
    fn test_next_combination_lexicographic() {
        let mut indices = vec![0, 1];
        let mut seen = vec![indices.clone()];
        while next_combination(&mut indices, 4) {
            seen.push(indices.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn test_next_permutation_lexicographic() {
        let mut items = vec![0, 1, 2];
        let mut seen = vec![items.clone()];
        while next_permutation(&mut items) {
            seen.push(items.clone());
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[1], vec![0, 2, 1]);
        assert_eq!(seen[5], vec![2, 1, 0]);
    }

    #[test]
    fn test_source_is_order_sensitive() {
        let sourcer = EventSourcer::new(drinks()).unwrap();

        let less_last = sourcer.source(&["ICE", "LESS_ICE"]).unwrap();
        let more_last = sourcer.source(&["LESS_ICE", "ICE"]).unwrap();

        assert_eq!(less_last.get("ice"), Some(&"less"));
        assert_eq!(more_last.get("ice"), Some(&"more"));
    }

    #[test]
    fn test_source_empty_and_duplicates() {
        let sourcer = EventSourcer::new(drinks()).unwrap();

        assert!(sourcer.source(&[]).unwrap().is_empty());

        let merged = sourcer.source(&["ICE", "LESS_ICE", "ICE"]).unwrap();
        assert_eq!(merged.get("ice"), Some(&"more"));
    }

    #[test]
    fn test_source_unknown_label() {
        let sourcer = EventSourcer::new(drinks()).unwrap();

        let error = sourcer.source(&["ICE", "MILK"]).unwrap_err();
        assert_eq!(error.code(), ErrorCode::UnknownLabel);
        assert!(error.message().contains("MILK"));
        assert_eq!(sourcer.len(), 3);
    }

    #[test]
    fn test_exhaustive_visits_every_ordering_once() {
        let sourcer = EventSourcer::new(drinks()).unwrap();

        let orders: Vec<Vec<&str>> = sourcer.exhaustive().map(|(order, _)| order).collect();
        let unique: HashSet<_> = orders.iter().cloned().collect();

        assert_eq!(orders.len() as u128, sourcer.ordering_bound());
        assert_eq!(unique.len(), orders.len());
        assert_eq!(orders[0], Vec::<&str>::new());
        assert_eq!(orders[1], vec!["ICE"]);
        assert_eq!(orders[4], vec!["ICE", "SUGAR"]);
        assert_eq!(orders[5], vec!["SUGAR", "ICE"]);
    }

    #[test]
    fn test_exhaustive_is_restartable() {
        let sourcer = EventSourcer::new(drinks()).unwrap();

        let mut first = sourcer.exhaustive();
        first.next();
        first.next();

        assert_eq!(sourcer.exhaustive().count(), 16);
        assert_eq!(first.count(), 14);
    }

    #[test]
    fn test_exhaustive_respects_constraints() {
        let constraints = ConstraintSet::new()
            .with(MutuallyExclusiveConstraint::new(["ICE", "LESS_ICE"]))
            .with(DependencyConstraint::new(["SUGAR"], ["ICE", "LESS_ICE"]).unwrap());
        let sourcer = EventSourcer::with_constraints(drinks(), constraints).unwrap();

        let orders: Vec<Vec<&str>> = sourcer.exhaustive().map(|(order, _)| order).collect();

        // {}, {ICE}, {SUGAR}, {LESS_ICE}, (SUGAR, ICE), (SUGAR, LESS_ICE)
        assert_eq!(orders.len(), 6);
        assert!(orders.contains(&vec!["SUGAR", "ICE"]));
        assert!(!orders.contains(&vec!["ICE", "SUGAR"]));
        assert!(!orders
            .iter()
            .any(|order| order.contains(&"ICE") && order.contains(&"LESS_ICE")));
    }

    #[test]
    fn test_constraint_with_unknown_label_fails_construction() {
        let constraints =
            ConstraintSet::new().with(MutuallyExclusiveConstraint::new(["ICE", "MILK"]));

        let error = EventSourcer::with_constraints(drinks(), constraints).unwrap_err();
        assert_eq!(error.code(), ErrorCode::UnknownConstraintLabel);
    }

    #[test]
    fn test_check_reports_rejecting_constraint() {
        let constraints = ConstraintSet::new()
            .with(MutuallyExclusiveConstraint::new(["ICE", "LESS_ICE"]).named("ice_level"));
        let sourcer = EventSourcer::with_constraints(drinks(), constraints).unwrap();

        assert!(sourcer.check(&["ICE", "SUGAR"]).is_ok());

        let error = sourcer.check(&["ICE", "LESS_ICE"]).unwrap_err();
        assert_eq!(error.code(), ErrorCode::ConstraintViolation);
        assert!(error.message().contains("ice_level"));

        let error = sourcer.check(&["MILK"]).unwrap_err();
        assert_eq!(error.code(), ErrorCode::UnknownLabel);
    }

    #[test]
    fn test_registered_orders() {
        let mut sourcer = EventSourcer::new(drinks()).unwrap();

        sourcer.register("sweet", vec!["SUGAR"]).unwrap();
        sourcer.register("cold", vec!["SUGAR", "ICE"]).unwrap();
        sourcer.register("sweet", vec!["SUGAR", "LESS_ICE"]).unwrap();

        assert_eq!(sourcer.order("sweet"), Some(&["SUGAR", "LESS_ICE"][..]));

        let names: Vec<&str> = sourcer.registered().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["sweet", "cold"]);

        let cold = sourcer.source_registered("cold").unwrap();
        assert_eq!(cold.get("ice"), Some(&"more"));

        let error = sourcer.source_registered("hot").unwrap_err();
        assert_eq!(error.code(), ErrorCode::UnknownOrder);
    }

    #[test]
    fn test_register_rejects_invalid_order() {
        let constraints =
            ConstraintSet::new().with(MutuallyExclusiveConstraint::new(["ICE", "LESS_ICE"]));
        let mut sourcer = EventSourcer::with_constraints(drinks(), constraints).unwrap();

        assert!(sourcer.register("muddled", vec!["ICE", "LESS_ICE"]).is_err());
        assert!(sourcer.register("milky", vec!["MILK"]).is_err());
        assert!(sourcer.order("muddled").is_none());
        assert_eq!(sourcer.registered().count(), 0);
    }
}
