//! Snapshot persistence: where records go between runs.

mod json_file;
mod snapshot_loop;

pub use json_file::JsonFileSink;
pub use snapshot_loop::{SnapshotHandle, SnapshotLoop};
