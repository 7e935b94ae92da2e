//! Domain model (ids, stages, status, records, stage log, errors).

pub mod errors;
pub mod ids;
pub mod pairing;
pub mod record;
pub mod stage;
pub mod stage_log;
pub mod status;

pub use errors::TrackerError;
pub use ids::{FileHandle, TaskId};
pub use pairing::{PairingError, PairingTable, STANDARD_PAIRS};
pub use record::TaskRecord;
pub use stage::{Stage, StageKind};
pub use stage_log::{LogEntry, StageError, StageFailure, StageLog};
pub use status::FileStatus;
