//! Event sourcing over labeled layers.
//!
//! Layers are registered once, then folded in any caller-chosen order or
//! enumerated exhaustively under combination and ordering constraints.

pub mod constraint;
pub mod effect;
pub mod registry;
pub mod sourcer;

pub use constraint::{
    Constraint, ConstraintSet, DependencyConstraint, MutuallyExclusiveConstraint,
    OccurrenceConstraint,
};
pub use effect::Effect;
pub use registry::{Label, LayerRegistry};
pub use sourcer::{ordering_bound, EventSourcer, Exhaustive};
