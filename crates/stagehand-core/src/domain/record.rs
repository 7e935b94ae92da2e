//! Task record: per-file processing state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FileHandle, TaskId};
use super::stage_log::StageLog;
use super::status::FileStatus;

/// Everything the tracker knows about one file.
///
/// Design:
/// - This is the "single source of truth" for a file's progress.
/// - The store hands out clones; live records are only touched through the
///   store's operations.
/// - `file` is a non-owning handle and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,

    #[serde(skip)]
    pub file: Option<FileHandle>,

    /// Name of the file when it was first registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,

    #[serde(default)]
    pub formatted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,

    pub status: FileStatus,

    #[serde(default)]
    pub stage_log: StageLog,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(id: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            file: None,
            original_name: None,
            tags: BTreeSet::new(),
            classification: None,
            formatted: false,
            new_path: None,
            new_name: None,
            status: FileStatus::Queued,
            stage_log: StageLog::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    /// Insert a tag. Returns false if it was already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Replace all tags (duplicates in the input collapse).
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stage;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn new_record_starts_queued_and_empty() {
        let record = TaskRecord::new(TaskId::new("f1"), now());
        assert_eq!(record.status, FileStatus::Queued);
        assert!(record.tags.is_empty());
        assert!(record.stage_log.is_empty());
        assert!(record.file.is_none());
        assert!(!record.formatted);
    }

    #[test]
    fn tags_never_duplicate() {
        let mut record = TaskRecord::new(TaskId::new("f1"), now());
        assert!(record.add_tag("x"));
        assert!(!record.add_tag("x"));
        assert_eq!(record.tags.len(), 1);

        record.set_tags(["a", "b", "a"]);
        assert_eq!(record.tags.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn file_handle_is_not_serialized() {
        let mut record = TaskRecord::new(TaskId::new("f1"), now());
        record.file = Some(FileHandle::new("inbox/note.md"));
        record.stage_log.start(Stage::Extract, now(), 0);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("file").is_none());

        let back: TaskRecord = serde_json::from_value(json).unwrap();
        assert!(back.file.is_none());
        assert!(back.stage_log.contains(Stage::Extract));
    }
}
