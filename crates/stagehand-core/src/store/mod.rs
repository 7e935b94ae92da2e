//! Store module: the in-memory tracker, its builder and query surface.

mod builder;
mod memory;
mod query;

pub use builder::{BuildError, TrackerBuilder};
pub use memory::InMemoryTracker;
