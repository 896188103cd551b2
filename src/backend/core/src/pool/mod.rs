//! Asynchronous object pool for expensive, reusable resources.
//!
//! Instances implement [`Recyclable`]. The pool bounds how many exist at once,
//! recycles them through a FIFO free queue, and suspends fetchers in arrival
//! order when every instance is leased.

pub mod config;
pub mod object_pool;
pub mod recyclable;

pub use config::{Factory, PoolConfig, PoolSettings};
pub use object_pool::{ObjectPool, ObjectPoolStats, Pooled, SlotId, SlotState};
pub use recyclable::Recyclable;
