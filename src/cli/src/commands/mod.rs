//! Subcommand implementations.

pub mod pool;
pub mod registry;
pub mod source;
