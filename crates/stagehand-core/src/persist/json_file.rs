//! JSON file snapshot sink.
//!
//! File shape: `{ "<task id>": <record>, ... }`, pretty-printed, ids sorted.
//! File handles are never written.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{TaskId, TaskRecord, TrackerError};
use crate::ports::SnapshotSink;

pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl SnapshotSink for JsonFileSink {
    async fn load(&self) -> Result<Vec<TaskRecord>, TrackerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TrackerError::io(&self.path, e)),
        };

        let records: BTreeMap<TaskId, TaskRecord> = serde_json::from_str(&content)?;
        Ok(records.into_values().collect())
    }

    async fn save(&self, records: &[TaskRecord]) -> Result<(), TrackerError> {
        let by_id: BTreeMap<&TaskId, &TaskRecord> =
            records.iter().map(|record| (&record.id, record)).collect();
        let content = serde_json::to_string_pretty(&by_id)?;

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| TrackerError::io(dir, e))?;
        }

        // write-then-rename so readers never see a half-written file
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| TrackerError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| TrackerError::io(&self.path, e))?;
        Ok(())
    }
}
