#![allow(clippy::result_large_err)]
//! # Lazy Pattern Core
//!
//! Two independent building blocks for deferring and reusing work.
//!
//! ## Architecture
//!
//! - **Sourcing**: builds state by folding labeled layers in a chosen order,
//!   and lazily enumerates every order that satisfies a set of constraints
//! - **Pool**: bounded asynchronous object pool with FIFO reuse, FIFO waiters,
//!   timeouts, cancellation and RAII lease handles
//! - **Telemetry**: structured logging and Prometheus metrics
//! - **Config**: file and environment configuration

pub mod config;
pub mod error;
pub mod pool;
pub mod sourcing;
pub mod telemetry;

pub use error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, PatternError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, PatternError, Result};
    pub use crate::pool::{
        Factory, ObjectPool, ObjectPoolStats, PoolConfig, PoolSettings, Pooled, Recyclable, SlotId,
        SlotState,
    };
    pub use crate::sourcing::{
        ordering_bound, Constraint, ConstraintSet, DependencyConstraint, Effect, EventSourcer,
        Exhaustive, Label, LayerRegistry, MutuallyExclusiveConstraint, OccurrenceConstraint,
    };
}
