//! Query surface over the in-memory tracker.

use crate::domain::{LogEntry, Stage, StageError, TaskId, TaskRecord};
use crate::ports::{ProgressQuery, StatusCounts};

use super::InMemoryTracker;

impl ProgressQuery for InMemoryTracker {
    fn get_record(&self, id: &TaskId) -> Option<TaskRecord> {
        self.read(id, TaskRecord::clone)
    }

    fn has_errors(&self, id: &TaskId, stage: Option<Stage>) -> bool {
        self.read(id, |record| record.stage_log.has_errors(stage)).unwrap_or(false)
    }

    fn get_stage_log(&self, id: &TaskId, stage: Stage) -> Option<LogEntry> {
        self.read(id, |record| record.stage_log.get(stage).cloned()).flatten()
    }

    fn get_last_stage(&self, id: &TaskId) -> Option<Stage> {
        self.read(id, |record| record.stage_log.last_stage()).flatten()
    }

    fn get_all_records(&self) -> Vec<TaskRecord> {
        self.collect(|record| Some(record.clone()))
    }

    fn get_records_with_errors(&self) -> Vec<TaskRecord> {
        self.collect(|record| record.stage_log.has_errors(None).then(|| record.clone()))
    }

    fn get_records_by_stage(&self, stage: Stage) -> Vec<TaskRecord> {
        self.collect(|record| record.stage_log.contains(stage).then(|| record.clone()))
    }

    fn get_stage_errors(&self, id: &TaskId) -> Vec<(Stage, StageError)> {
        self.read(id, |record| record.stage_log.errors()).unwrap_or_default()
    }

    fn get_last_error(&self, id: &TaskId) -> Option<(Stage, StageError)> {
        self.read(id, |record| record.stage_log.last_error()).flatten()
    }

    fn get_stage_history(&self, id: &TaskId, stage: Stage) -> Vec<LogEntry> {
        self.read(id, |record| record.stage_log.attempts(stage)).unwrap_or_default()
    }

    fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for status in self.collect(|record| Some(record.status)) {
            counts.record(status);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileStatus, StageFailure};
    use crate::ports::RecordStore;
    use crate::store::TrackerBuilder;

    fn tracker() -> InMemoryTracker {
        TrackerBuilder::new().build().unwrap()
    }

    #[test]
    fn unknown_ids_read_as_absent() {
        let tracker = tracker();
        let ghost = TaskId::new("ghost");

        assert!(tracker.get_record(&ghost).is_none());
        assert!(!tracker.has_errors(&ghost, None));
        assert!(tracker.get_stage_log(&ghost, Stage::Extract).is_none());
        assert!(tracker.get_last_stage(&ghost).is_none());
        assert!(tracker.get_stage_errors(&ghost).is_empty());
        assert!(tracker.get_last_error(&ghost).is_none());
        assert!(tracker.get_stage_history(&ghost, Stage::Extract).is_empty());
        // and none of that registered anything
        assert!(tracker.get_all_records().is_empty());
    }

    #[test]
    fn last_stage_of_empty_log_is_none() {
        let tracker = tracker();
        let id = tracker.start_tracking(TaskId::new("f1"));
        assert!(tracker.get_last_stage(&id).is_none());
    }

    #[test]
    fn records_by_stage_ignores_completion() {
        let tracker = tracker();
        let a = tracker.start_tracking(TaskId::new("a"));
        let b = tracker.start_tracking(TaskId::new("b"));
        let c = tracker.start_tracking(TaskId::new("c"));

        tracker.log_stage_start(&a, Stage::Classify);
        tracker.log_stage_start(&b, Stage::Classify);
        tracker.log_stage_done(&b, Stage::ClassifyDone);
        tracker.log_stage_start(&c, Stage::Extract);

        let mut ids: Vec<String> = tracker
            .get_records_by_stage(Stage::Classify)
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
        // the paired completion never creates its own key
        assert!(tracker.get_records_by_stage(Stage::ClassifyDone).is_empty());
    }

    #[test]
    fn records_with_errors_filters() {
        let tracker = tracker();
        let ok = tracker.start_tracking(TaskId::new("ok"));
        let bad = tracker.start_tracking(TaskId::new("bad"));
        tracker.log_stage_start(&ok, Stage::Extract);
        tracker.log_error(&bad, StageFailure::new(Stage::ErrorExtract, "unreadable"));

        let with_errors = tracker.get_records_with_errors();
        assert_eq!(with_errors.len(), 1);
        assert_eq!(with_errors[0].id, bad);
    }

    #[test]
    fn returned_records_are_snapshots() {
        let tracker = tracker();
        let id = tracker.start_tracking(TaskId::new("f1"));
        let before = tracker.get_record(&id).unwrap();

        tracker.set_status(&id, FileStatus::Processing);

        assert_eq!(before.status, FileStatus::Queued);
        assert_eq!(
            tracker.get_record(&id).unwrap().status,
            FileStatus::Processing
        );
    }

    #[test]
    fn status_counts_cover_every_record() {
        let tracker = tracker();
        let a = tracker.start_tracking(TaskId::new("a"));
        let b = tracker.start_tracking(TaskId::new("b"));
        tracker.start_tracking(TaskId::new("c"));
        tracker.set_status(&a, FileStatus::Completed);
        tracker.set_status(&b, FileStatus::Bypassed);

        let counts = tracker.status_counts();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.bypassed, 1);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn stage_history_without_limit_is_latest_only() {
        let tracker = tracker();
        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.log_stage_start(&id, Stage::Rename);
        tracker.log_stage_start(&id, Stage::Rename);

        let history = tracker.get_stage_history(&id, Stage::Rename);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0],
            tracker.get_stage_log(&id, Stage::Rename).unwrap()
        );
    }
}
