//! TrackerBuilder - construction and wiring of an `InMemoryTracker`.
//!
//! # Fail-fast 設計
//! - the pairing table is validated in `build()`, before any record exists
//! - a bad table is a `BuildError`, never a surprise at `log_stage_done` time

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::domain::{PairingError, PairingTable, STANDARD_PAIRS, Stage};
use crate::ports::{Clock, SystemClock};

use super::InMemoryTracker;

/// BuildError はトラッカー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid stage pairing table: {0}")]
    InvalidPairing(#[from] PairingError),
}

/// Builds an `InMemoryTracker`.
///
/// # 使用例
/// ```ignore
/// let tracker = TrackerBuilder::new()
///     .config(&config)
///     .clock(Arc::new(SystemClock))
///     .build()?;
/// ```
pub struct TrackerBuilder {
    pairs: Vec<(Stage, Stage)>,
    allow_unpaired: Vec<Stage>,
    clock: Arc<dyn Clock>,
    history_limit: usize,
}

impl TrackerBuilder {
    pub fn new() -> Self {
        Self {
            pairs: STANDARD_PAIRS.to_vec(),
            allow_unpaired: Vec::new(),
            clock: Arc::new(SystemClock),
            history_limit: 0,
        }
    }

    /// Apply the tracker-relevant parts of a config.
    pub fn config(mut self, config: &TrackerConfig) -> Self {
        self.history_limit = config.history_limit;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Replace the pairing table. `allow_unpaired` lists completion stages
    /// that intentionally have no start stage.
    pub fn pairs(mut self, pairs: &[(Stage, Stage)], allow_unpaired: &[Stage]) -> Self {
        self.pairs = pairs.to_vec();
        self.allow_unpaired = allow_unpaired.to_vec();
        self
    }

    pub fn build(self) -> Result<InMemoryTracker, BuildError> {
        let pairings = PairingTable::from_pairs(&self.pairs, &self.allow_unpaired)?;
        Ok(InMemoryTracker::from_parts(
            pairings,
            self.clock,
            self.history_limit,
        ))
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
