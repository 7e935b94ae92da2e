//! Tracker configuration (TOML).
//!
//! ```toml
//! history_limit = 4
//!
//! [persistence]
//! path = "_stagehand/records.json"
//! debounce_ms = 1000
//! ```
//!
//! Every key is optional; an empty document gives the in-memory,
//! latest-entry-only tracker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::TrackerError;

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Replaced stage attempts kept per stage. 0 keeps only the live entry.
    pub history_limit: usize,

    /// Snapshot persistence; absent means purely in-memory.
    pub persistence: Option<PersistenceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceConfig {
    pub path: PathBuf,

    /// Quiet period after the last change before a snapshot is written.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl PersistenceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl TrackerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, TrackerError> {
        let config: TrackerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| TrackerError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), TrackerError> {
        if let Some(persistence) = &self.persistence {
            if persistence.path.as_os_str().is_empty() {
                return Err(TrackerError::Config(
                    "persistence.path must not be empty".to_string(),
                ));
            }
            if persistence.debounce_ms == 0 {
                return Err(TrackerError::Config(
                    "persistence.debounce_ms must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}
