//! The contract a pooled resource fulfils.

/// A resource that can be handed out, scrubbed, and handed out again.
///
/// The pool only guarantees that [`Recyclable::reset`] runs on every return
/// to the free queue. Callers decide when [`Recyclable::initialize`] runs,
/// typically right after a fetch.
pub trait Recyclable: Send + 'static {
    /// Arguments for preparing an instance for one use.
    type Args;

    /// Prepare for use.
    fn initialize(&mut self, args: Self::Args);

    /// Clear per-use state before the instance becomes free again.
    fn reset(&mut self);
}
