//! SnapshotSink port - where record snapshots are saved and restored from.
//!
//! Best-effort only: the tracker keeps working in memory whatever happens
//! here, and a crash between saves loses the latest changes.

use async_trait::async_trait;

use crate::domain::{TaskRecord, TrackerError};

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Previously saved records (empty when nothing was saved yet).
    async fn load(&self) -> Result<Vec<TaskRecord>, TrackerError>;

    /// Replace the saved snapshot with `records`.
    async fn save(&self, records: &[TaskRecord]) -> Result<(), TrackerError>;
}
