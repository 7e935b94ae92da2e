//! ProgressQuery port - what progress consumers are allowed to see.
//!
//! Pure reads: nothing here registers records, moves timestamps or wakes the
//! snapshot loop, so pollers may call at any rate.

use serde::{Deserialize, Serialize};

use crate::domain::{FileStatus, LogEntry, Stage, StageError, TaskId, TaskRecord};

/// Number of records per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
    pub bypassed: usize,
    pub total: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::Queued => self.queued += 1,
            FileStatus::Processing => self.processing += 1,
            FileStatus::Completed => self.completed += 1,
            FileStatus::Error => self.error += 1,
            FileStatus::Bypassed => self.bypassed += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, status: FileStatus) -> usize {
        match status {
            FileStatus::Queued => self.queued,
            FileStatus::Processing => self.processing,
            FileStatus::Completed => self.completed,
            FileStatus::Error => self.error,
            FileStatus::Bypassed => self.bypassed,
        }
    }

    /// Every counted record is in an end state.
    pub fn all_terminal(&self) -> bool {
        self.queued == 0 && self.processing == 0
    }
}

/// Read-only lookups and aggregations over the tracker.
///
/// Unknown ids yield `None`, `false` or an empty list. Returned records are
/// snapshots; later mutations do not show through them.
pub trait ProgressQuery: Send + Sync {
    fn get_record(&self, id: &TaskId) -> Option<TaskRecord>;

    /// Any entry (or, with `stage`, that stage's entry) carries an error.
    fn has_errors(&self, id: &TaskId, stage: Option<Stage>) -> bool;

    fn get_stage_log(&self, id: &TaskId, stage: Stage) -> Option<LogEntry>;

    /// Stage with the most recent timestamp; ties go to the entry logged last.
    fn get_last_stage(&self, id: &TaskId) -> Option<Stage>;

    /// All records, unordered.
    fn get_all_records(&self) -> Vec<TaskRecord>;

    fn get_records_with_errors(&self) -> Vec<TaskRecord>;

    /// Records with an entry for `stage`, completed or not.
    fn get_records_by_stage(&self, stage: Stage) -> Vec<TaskRecord>;

    /// Entries carrying an error, in the order they were logged.
    fn get_stage_errors(&self, id: &TaskId) -> Vec<(Stage, StageError)>;

    /// Most recently logged error (last of `get_stage_errors`).
    fn get_last_error(&self, id: &TaskId) -> Option<(Stage, StageError)>;

    /// Replaced attempts of `stage` (oldest first) followed by the live entry.
    /// Only the live entry unless history is enabled.
    fn get_stage_history(&self, id: &TaskId, stage: Stage) -> Vec<LogEntry>;

    fn status_counts(&self) -> StatusCounts;
}
