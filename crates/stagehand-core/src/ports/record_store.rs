//! RecordStore port - the orchestrator's write side.
//!
//! Every mutation is best-effort: a call naming an id that was never
//! registered is dropped, never an error. Registration races with early
//! annotations must not take the pipeline down.

use crate::domain::{FileHandle, FileStatus, Stage, StageFailure, TaskId};

/// Mutations of task records and their stage logs.
///
/// # Concurrency
/// - Calls for the same id are serialized by the implementation.
/// - Calls for different ids never wait on each other.
/// - No call blocks on I/O.
pub trait RecordStore: Send + Sync {
    /// Register `id` with status `Queued`. Idempotent: an existing record is
    /// left untouched and the same id is returned.
    fn start_tracking(&self, id: TaskId) -> TaskId;

    /// Like `start_tracking`, also remembering the file's original name.
    /// The name only sticks on the first registration.
    fn start_tracking_with_name(&self, id: TaskId, original_name: &str) -> TaskId;

    fn attach_file(&self, id: &TaskId, handle: FileHandle);

    /// Overwrite the status. Not validated against the transition table.
    fn set_status(&self, id: &TaskId, status: FileStatus);

    fn set_tags(&self, id: &TaskId, tags: Vec<String>);

    fn add_tag(&self, id: &TaskId, tag: &str);

    fn set_classification(&self, id: &TaskId, classification: &str);

    fn set_formatted(&self, id: &TaskId, formatted: bool);

    fn set_new_path(&self, id: &TaskId, path: &str);

    fn set_new_name(&self, id: &TaskId, name: &str);

    /// Start (or restart) a stage: the entry is overwritten with a fresh
    /// timestamp and `completed = false`.
    fn log_stage_start(&self, id: &TaskId, stage: Stage);

    /// Completion signal. A paired done stage closes its start entry in place;
    /// anything else gets its own completed entry.
    fn log_stage_done(&self, id: &TaskId, stage: Stage);

    /// The orchestrator deliberately did not run `stage`.
    fn log_stage_skipped(&self, id: &TaskId, stage: Stage);

    /// Record a failure. Leaves `status` alone and never touches other records.
    fn log_error(&self, id: &TaskId, failure: StageFailure);
}
