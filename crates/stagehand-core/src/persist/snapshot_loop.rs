//! SnapshotLoop - debounced background saving of tracker snapshots.
//!
//! # フロー
//! 1. wait for the tracker's change notification
//! 2. wait until no change arrived for `debounce`
//! 3. save a full snapshot, go back to 1
//!
//! Shutdown flushes once more so the last changes are not lost.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::TrackerError;
use crate::ports::SnapshotSink;
use crate::store::InMemoryTracker;

pub struct SnapshotLoop {
    tracker: Arc<InMemoryTracker>,
    sink: Arc<dyn SnapshotSink>,
    debounce: Duration,
}

/// Running loop. Dropping it without `shutdown` leaves the task running
/// until the runtime stops.
pub struct SnapshotHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SnapshotHandle {
    /// Stop the loop after a final save.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "snapshot loop terminated abnormally");
        }
    }
}

impl SnapshotLoop {
    pub fn new(
        tracker: Arc<InMemoryTracker>,
        sink: Arc<dyn SnapshotSink>,
        debounce: Duration,
    ) -> Self {
        Self {
            tracker,
            sink,
            debounce,
        }
    }

    /// Load the saved snapshot into the tracker.
    ///
    /// An unreadable snapshot is logged and skipped; the tracker then starts
    /// empty rather than refusing to start.
    pub async fn restore(&self) -> usize {
        match self.sink.load().await {
            Ok(records) => {
                let restored = self.tracker.restore(records);
                info!(restored, "snapshot restored");
                restored
            }
            Err(e) => {
                warn!(error = %e, "failed to load snapshot, starting empty");
                0
            }
        }
    }

    /// Save the current state right now.
    pub async fn flush(&self) -> Result<usize, TrackerError> {
        let records = self.tracker.snapshot();
        self.sink.save(&records).await?;
        Ok(records.len())
    }

    pub fn spawn(self) -> SnapshotHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SnapshotHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let changed = self.tracker.change_notifier();

        'outer: loop {
            tokio::select! {
                _ = changed.notified() => {},
                _ = shutdown.changed() => break 'outer,
            }

            // Quiet period: every new change restarts the timer.
            loop {
                tokio::select! {
                    _ = changed.notified() => continue,
                    _ = tokio::time::sleep(self.debounce) => break,
                    _ = shutdown.changed() => break 'outer,
                }
            }

            self.save_logged().await;
        }

        self.save_logged().await;
        debug!("snapshot loop stopped");
    }

    async fn save_logged(&self) {
        match self.flush().await {
            Ok(count) => debug!(records = count, "snapshot saved"),
            Err(e) => error!(error = %e, "failed to save snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileStatus, Stage, TaskId, TaskRecord};
    use crate::persist::JsonFileSink;
    use crate::ports::{ProgressQuery, RecordStore};
    use crate::store::TrackerBuilder;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Keeps every save in memory.
    #[derive(Default)]
    struct RecordingSink {
        saves: Mutex<Vec<Vec<TaskRecord>>>,
    }

    impl RecordingSink {
        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        fn last(&self) -> Option<Vec<TaskRecord>> {
            self.saves.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl SnapshotSink for RecordingSink {
        async fn load(&self) -> Result<Vec<TaskRecord>, TrackerError> {
            Ok(Vec::new())
        }

        async fn save(&self, records: &[TaskRecord]) -> Result<(), TrackerError> {
            self.saves.lock().unwrap().push(records.to_vec());
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl SnapshotSink for BrokenSink {
        async fn load(&self) -> Result<Vec<TaskRecord>, TrackerError> {
            Err(TrackerError::Config("unreadable".to_string()))
        }

        async fn save(&self, _records: &[TaskRecord]) -> Result<(), TrackerError> {
            Err(TrackerError::Config("read-only".to_string()))
        }
    }

    fn tracker() -> Arc<InMemoryTracker> {
        Arc::new(TrackerBuilder::new().build().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_is_saved_once() {
        let tracker = tracker();
        let sink = Arc::new(RecordingSink::default());
        let handle = SnapshotLoop::new(tracker.clone(), sink.clone(), Duration::from_millis(1000))
            .spawn();

        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.set_status(&id, FileStatus::Processing);
        tracker.log_stage_start(&id, Stage::Extract);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.save_count(), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(sink.save_count(), 1);
        let saved = sink.last().unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].stage_log.contains(Stage::Extract));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_changes() {
        let tracker = tracker();
        let sink = Arc::new(RecordingSink::default());
        let handle = SnapshotLoop::new(tracker.clone(), sink.clone(), Duration::from_secs(60))
            .spawn();

        let id = tracker.start_tracking(TaskId::new("f1"));
        tracker.set_status(&id, FileStatus::Completed);
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle.shutdown().await;

        let saved = sink.last().unwrap();
        assert_eq!(saved[0].status, FileStatus::Completed);
    }

    #[tokio::test]
    async fn save_failures_do_not_stop_the_loop() {
        let tracker = tracker();
        let handle = SnapshotLoop::new(tracker.clone(), Arc::new(BrokenSink), Duration::from_millis(5))
            .spawn();

        let id = tracker.start_tracking(TaskId::new("f1"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tracker.set_status(&id, FileStatus::Processing);
        tokio::time::sleep(Duration::from_millis(30)).await;

        handle.shutdown().await;
        assert_eq!(tracker.get_record(&id).unwrap().status, FileStatus::Processing);
    }

    #[tokio::test]
    async fn unreadable_snapshot_restores_nothing() {
        let tracker = tracker();
        let restored = SnapshotLoop::new(tracker.clone(), Arc::new(BrokenSink), Duration::from_millis(5))
            .restore()
            .await;

        assert_eq!(restored, 0);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn records_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        let first = tracker();
        let id = first.start_tracking_with_name(TaskId::new("f1"), "scan.pdf");
        first.set_classification(&id, "invoice");
        first.log_stage_start(&id, Stage::Classify);
        first.log_stage_done(&id, Stage::ClassifyDone);
        let snapshots = SnapshotLoop::new(
            first.clone(),
            Arc::new(JsonFileSink::new(&path)),
            Duration::from_millis(5),
        );
        snapshots.flush().await.unwrap();

        let second = tracker();
        let restored = SnapshotLoop::new(
            second.clone(),
            Arc::new(JsonFileSink::new(&path)),
            Duration::from_millis(5),
        )
        .restore()
        .await;

        assert_eq!(restored, 1);
        let record = second.get_record(&id).unwrap();
        assert_eq!(record.classification.as_deref(), Some("invoice"));
        assert_eq!(record.original_name.as_deref(), Some("scan.pdf"));
        assert!(second.get_stage_log(&id, Stage::Classify).unwrap().completed);
    }
}
