//! File status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing status of a tracked file.
///
/// State transitions (advisory, see `can_transition_to`):
/// - Queued -> Processing -> Completed
/// - Queued -> Processing -> Error
/// - Queued | Processing -> Bypassed
/// - Queued -> Error (failed before any stage ran)
///
/// The store never enforces these. Status is whatever the orchestrator last
/// wrote; stage log activity does not move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Registered, waiting for a pipeline slot.
    #[default]
    Queued,

    /// A pipeline instance is working on it.
    Processing,

    /// Every stage finished.
    Completed,

    /// The orchestrator gave up on it.
    Error,

    /// Deliberately left alone (e.g. excluded by user settings).
    Bypassed,
}

impl FileStatus {
    pub const ALL: [FileStatus; 5] = [
        FileStatus::Queued,
        FileStatus::Processing,
        FileStatus::Completed,
        FileStatus::Error,
        FileStatus::Bypassed,
    ];

    /// Is this an end state (callers should stop advancing the file)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileStatus::Completed | FileStatus::Error | FileStatus::Bypassed
        )
    }

    /// Advisory legality table. Rewriting the current status is always fine.
    pub fn can_transition_to(self, next: FileStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            FileStatus::Queued => matches!(
                next,
                FileStatus::Processing | FileStatus::Bypassed | FileStatus::Error
            ),
            FileStatus::Processing => matches!(
                next,
                FileStatus::Completed | FileStatus::Error | FileStatus::Bypassed
            ),
            FileStatus::Completed | FileStatus::Error | FileStatus::Bypassed => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Queued => "queued",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
            FileStatus::Bypassed => "bypassed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
