//! In-memory tracker implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::domain::{
    FileHandle, FileStatus, PairingTable, Stage, StageFailure, TaskId, TaskRecord,
};
use crate::ports::{Clock, RecordStore};

use super::TrackerBuilder;

/// In-memory tracker.
///
/// Design:
/// - `records` is the single source of truth; one entry per registered id.
/// - Per-key locking: every operation on an id runs under that key's shard
///   lock, so two writes to the same record are serialized while other
///   records carry on.
/// - Each mutation pings `changed`, which the snapshot loop listens to.
///   Reads never do.
pub struct InMemoryTracker {
    records: DashMap<TaskId, TaskRecord>,
    pairings: PairingTable,
    clock: Arc<dyn Clock>,
    history_limit: usize,
    changed: Arc<Notify>,
}

impl InMemoryTracker {
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    pub(super) fn from_parts(
        pairings: PairingTable,
        clock: Arc<dyn Clock>,
        history_limit: usize,
    ) -> Self {
        Self {
            records: DashMap::new(),
            pairings,
            clock,
            history_limit,
            changed: Arc::new(Notify::new()),
        }
    }

    pub fn pairings(&self) -> &PairingTable {
        &self.pairings
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Notified after every mutation (one stored permit if nobody waits).
    pub fn change_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.changed)
    }

    /// Clone of every record, ordered by id.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Re-insert previously saved records. Ids that are already registered
    /// keep their live record. Returns how many records were restored.
    pub fn restore(&self, records: Vec<TaskRecord>) -> usize {
        let mut restored = 0;
        for mut record in records {
            record.file = None;
            if let Entry::Vacant(entry) = self.records.entry(record.id.clone()) {
                entry.insert(record);
                restored += 1;
            }
        }
        debug!(restored, "restored task records");
        restored
    }

    /// Run `f` against the live record of `id`, if any.
    pub(super) fn read<T>(&self, id: &TaskId, f: impl FnOnce(&TaskRecord) -> T) -> Option<T> {
        self.records.get(id).map(|record| f(record.value()))
    }

    /// Run `f` against every live record.
    pub(super) fn collect<T>(&self, mut f: impl FnMut(&TaskRecord) -> Option<T>) -> Vec<T> {
        self.records.iter().filter_map(|r| f(r.value())).collect()
    }

    fn register(&self, id: TaskId, original_name: Option<&str>) -> TaskId {
        let id = match self.records.entry(id) {
            Entry::Occupied(entry) => {
                debug!(task_id = %entry.key(), "already tracked");
                return entry.key().clone();
            }
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                let mut record = TaskRecord::new(id.clone(), self.clock.now());
                record.original_name = original_name.map(str::to_string);
                entry.insert(record);
                id
            }
        };

        debug!(task_id = %id, "tracking started");
        self.changed.notify_one();
        id
    }

    /// Apply a mutation to `id`. Unknown ids are dropped.
    fn update(&self, id: &TaskId, op: &'static str, f: impl FnOnce(&mut TaskRecord, DateTime<Utc>)) {
        let applied = match self.records.get_mut(id) {
            Some(mut record) => {
                let now = self.clock.now();
                f(record.value_mut(), now);
                record.touch(now);
                true
            }
            None => false,
        };

        if applied {
            self.changed.notify_one();
        } else {
            debug!(task_id = %id, op, "ignoring update for untracked record");
        }
    }
}

impl RecordStore for InMemoryTracker {
    fn start_tracking(&self, id: TaskId) -> TaskId {
        self.register(id, None)
    }

    fn start_tracking_with_name(&self, id: TaskId, original_name: &str) -> TaskId {
        self.register(id, Some(original_name))
    }

    fn attach_file(&self, id: &TaskId, handle: FileHandle) {
        self.update(id, "attach_file", |record, _| record.file = Some(handle));
    }

    fn set_status(&self, id: &TaskId, status: FileStatus) {
        self.update(id, "set_status", |record, _| {
            if !record.status.can_transition_to(status) {
                warn!(
                    task_id = %record.id,
                    from = %record.status,
                    to = %status,
                    "status change outside the usual lifecycle"
                );
            }
            record.status = status;
        });
    }

    fn set_tags(&self, id: &TaskId, tags: Vec<String>) {
        self.update(id, "set_tags", |record, _| record.set_tags(tags));
    }

    fn add_tag(&self, id: &TaskId, tag: &str) {
        self.update(id, "add_tag", |record, _| {
            record.add_tag(tag);
        });
    }

    fn set_classification(&self, id: &TaskId, classification: &str) {
        self.update(id, "set_classification", |record, _| {
            record.classification = Some(classification.to_string());
        });
    }

    fn set_formatted(&self, id: &TaskId, formatted: bool) {
        self.update(id, "set_formatted", |record, _| record.formatted = formatted);
    }

    fn set_new_path(&self, id: &TaskId, path: &str) {
        self.update(id, "set_new_path", |record, _| {
            record.new_path = Some(path.to_string());
        });
    }

    fn set_new_name(&self, id: &TaskId, name: &str) {
        self.update(id, "set_new_name", |record, _| {
            record.new_name = Some(name.to_string());
        });
    }

    fn log_stage_start(&self, id: &TaskId, stage: Stage) {
        let limit = self.history_limit;
        self.update(id, "log_stage_start", |record, now| {
            record.stage_log.start(stage, now, limit);
            debug!(task_id = %record.id, ?stage, "stage started");
        });
    }

    fn log_stage_done(&self, id: &TaskId, stage: Stage) {
        let base = self.pairings.start_for(stage);
        let limit = self.history_limit;
        self.update(id, "log_stage_done", |record, now| {
            let closed = record.stage_log.complete(stage, base, now, limit);
            debug!(task_id = %record.id, ?stage, entry = ?closed, "stage done");
        });
    }

    fn log_stage_skipped(&self, id: &TaskId, stage: Stage) {
        let limit = self.history_limit;
        self.update(id, "log_stage_skipped", |record, now| {
            record.stage_log.skip(stage, now, limit);
            debug!(task_id = %record.id, ?stage, "stage skipped");
        });
    }

    fn log_error(&self, id: &TaskId, failure: StageFailure) {
        let limit = self.history_limit;
        self.update(id, "log_error", |record, now| {
            debug!(
                task_id = %record.id,
                stage = ?failure.stage,
                message = %failure.message,
                "stage failed"
            );
            record.stage_log.fail(failure, now, limit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};

    fn tracker_with_clock() -> (InMemoryTracker, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let tracker = TrackerBuilder::new().clock(clock.clone()).build().unwrap();
        (tracker, clock)
    }

    fn record(tracker: &InMemoryTracker, id: &TaskId) -> TaskRecord {
        tracker.read(id, Clone::clone).unwrap()
    }

    #[test]
    fn start_tracking_creates_queued_record() {
        let (tracker, _) = tracker_with_clock();
        let id = tracker.start_tracking(TaskId::new("f1"));

        assert_eq!(id, TaskId::new("f1"));
        let r = record(&tracker, &id);
        assert_eq!(r.status, FileStatus::Queued);
        assert!(r.tags.is_empty());
        assert!(r.stage_log.is_empty());
        assert!(r.file.is_none());
    }

    #[test]
    fn start_tracking_is_idempotent() {
        let (tracker, _) = tracker_with_clock();
        let id = tracker.start_tracking_with_name(TaskId::new("f1"), "note.md");
        tracker.set_status(&id, FileStatus::Processing);
        tracker.add_tag(&id, "x");
        tracker.log_stage_start(&id, Stage::Extract);

        let again = tracker.start_tracking_with_name(TaskId::new("f1"), "other.md");

        assert_eq!(again, id);
        assert_eq!(tracker.len(), 1);
        let r = record(&tracker, &id);
        assert_eq!(r.status, FileStatus::Processing);
        assert!(r.tags.contains("x"));
        assert!(r.stage_log.contains(Stage::Extract));
        assert_eq!(r.original_name.as_deref(), Some("note.md"));
    }

    #[test]
    fn mutations_on_unknown_id_are_ignored() {
        let (tracker, _) = tracker_with_clock();
        let ghost = TaskId::new("ghost");

        tracker.attach_file(&ghost, FileHandle::new("a.md"));
        tracker.set_status(&ghost, FileStatus::Completed);
        tracker.set_tags(&ghost, vec!["a".to_string()]);
        tracker.add_tag(&ghost, "a");
        tracker.set_classification(&ghost, "invoice");
        tracker.set_formatted(&ghost, true);
        tracker.set_new_path(&ghost, "Finance");
        tracker.set_new_name(&ghost, "Invoice");
        tracker.log_stage_start(&ghost, Stage::Extract);
        tracker.log_stage_done(&ghost, Stage::ExtractDone);
        tracker.log_stage_skipped(&ghost, Stage::Formatting);
        tracker.log_error(&ghost, StageFailure::new(Stage::ErrorExtract, "boom"));

        assert!(tracker.is_empty());
    }

    #[test]
    fn field_setters_write_through() {
        let (tracker, _) = tracker_with_clock();
        let id = tracker.start_tracking(TaskId::new("f1"));

        tracker.attach_file(&id, FileHandle::new("Inbox/scan.pdf"));
        tracker.set_classification(&id, "invoice");
        tracker.set_formatted(&id, true);
        tracker.set_new_path(&id, "Finance/2024");
        tracker.set_new_name(&id, "ACME invoice");
        tracker.set_tags(&id, vec!["finance".into(), "acme".into(), "finance".into()]);

        let r = record(&tracker, &id);
        assert_eq!(r.file, Some(FileHandle::new("Inbox/scan.pdf")));
        assert_eq!(r.classification.as_deref(), Some("invoice"));
        assert!(r.formatted);
        assert_eq!(r.new_path.as_deref(), Some("Finance/2024"));
        assert_eq!(r.new_name.as_deref(), Some("ACME invoice"));
        assert_eq!(r.tags.len(), 2);
    }

    #[test]
    fn set_status_applies_even_outside_lifecycle() {
        let (tracker, _) = tracker_with_clock();
        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.set_status(&id, FileStatus::Completed);
        tracker.set_status(&id, FileStatus::Queued);

        assert_eq!(record(&tracker, &id).status, FileStatus::Queued);
    }

    #[test]
    fn error_does_not_change_status() {
        let (tracker, _) = tracker_with_clock();
        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.set_status(&id, FileStatus::Processing);
        tracker.log_error(&id, StageFailure::new(Stage::Classify, "timeout"));

        assert_eq!(record(&tracker, &id).status, FileStatus::Processing);
    }

    #[test]
    fn stage_timestamps_come_from_clock() {
        let (tracker, clock) = tracker_with_clock();
        let id = tracker.start_tracking(TaskId::new("f1"));
        let t0 = clock.now();

        tracker.log_stage_start(&id, Stage::Extract);
        clock.advance(Duration::seconds(2));
        tracker.log_stage_done(&id, Stage::ExtractDone);

        let r = record(&tracker, &id);
        let entry = r.stage_log.get(Stage::Extract).unwrap();
        assert_eq!(entry.timestamp, t0);
        assert_eq!(entry.completed_at, Some(t0 + Duration::seconds(2)));
        assert_eq!(r.updated_at, t0 + Duration::seconds(2));
    }

    #[test]
    fn history_limit_is_applied() {
        let tracker = TrackerBuilder::new().history_limit(1).build().unwrap();
        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.log_stage_start(&id, Stage::Moving);
        tracker.log_stage_start(&id, Stage::Moving);
        tracker.log_stage_start(&id, Stage::Moving);

        let r = record(&tracker, &id);
        assert_eq!(r.stage_log.attempts(Stage::Moving).len(), 2);
    }

    #[test]
    fn restore_keeps_live_records() {
        let (tracker, _) = tracker_with_clock();
        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.set_status(&id, FileStatus::Processing);

        let now = Utc::now();
        let mut stale = TaskRecord::new(TaskId::new("f1"), now);
        stale.status = FileStatus::Error;
        let mut saved = TaskRecord::new(TaskId::new("f2"), now);
        saved.file = Some(FileHandle::new("dangling"));

        let restored = tracker.restore(vec![stale, saved]);

        assert_eq!(restored, 1);
        assert_eq!(record(&tracker, &id).status, FileStatus::Processing);
        assert!(record(&tracker, &TaskId::new("f2")).file.is_none());
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let (tracker, _) = tracker_with_clock();
        for id in ["c", "a", "b"] {
            tracker.start_tracking(TaskId::new(id));
        }

        let ids: Vec<String> = tracker
            .snapshot()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn mutations_notify_reads_do_not() {
        let (tracker, _) = tracker_with_clock();
        let changed = tracker.change_notifier();

        let id = tracker.start_tracking(TaskId::new("f1"));
        // permit stored by the registration
        tokio::time::timeout(std::time::Duration::from_millis(50), changed.notified())
            .await
            .unwrap();

        let _ = tracker.read(&id, Clone::clone);
        let _ = tracker.snapshot();
        let idle =
            tokio::time::timeout(std::time::Duration::from_millis(50), changed.notified()).await;
        assert!(idle.is_err());
    }
}
