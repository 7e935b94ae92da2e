//! stagehand-core
//!
//! Per-file progress tracking for a multi-stage document pipeline.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, stage, pairing, stage_log, record, errors）
//! - **ports**: 抽象化レイヤー（RecordStore, ProgressQuery, Clock, IdentityProvider, SnapshotSink）
//! - **store**: in-memory tracker と builder
//! - **persist**: JSON snapshot の保存と復元
//! - **config**: TOML 設定
//!
//! # 使用例
//! ```ignore
//! let tracker = TrackerBuilder::new().build()?;
//! let id = tracker.start_tracking(TaskId::new("file-1"));
//! tracker.log_stage_start(&id, Stage::Extract);
//! tracker.log_stage_done(&id, Stage::ExtractDone);
//! assert!(tracker.get_stage_log(&id, Stage::Extract).unwrap().completed);
//! ```

pub mod config;
pub mod domain;
pub mod persist;
pub mod ports;
pub mod store;

pub use config::{PersistenceConfig, TrackerConfig};
pub use domain::{
    FileHandle, FileStatus, LogEntry, Stage, StageError, StageFailure, StageKind, TaskId,
    TaskRecord, TrackerError,
};
pub use ports::{ProgressQuery, RecordStore, StatusCounts};
pub use store::{BuildError, InMemoryTracker, TrackerBuilder};
