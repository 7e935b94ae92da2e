//! Ports - 抽象化レイヤー
//!
//! Seams between the tracker and its collaborators:
//! - the orchestrator writes through `RecordStore`
//! - progress consumers read through `ProgressQuery`
//! - time, identity and snapshot storage are injected

pub mod clock;
pub mod identity;
pub mod progress;
pub mod record_store;
pub mod snapshot_sink;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::identity::{ContentHashIdentity, IdentityProvider};
pub use self::progress::{ProgressQuery, StatusCounts};
pub use self::record_store::RecordStore;
pub use self::snapshot_sink::SnapshotSink;
