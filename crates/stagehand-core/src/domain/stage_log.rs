//! Per-record stage log: latest entry per stage, plus optional attempt history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::Stage;

/// Failure captured for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Stage the failure was filed under.
    pub stage: Stage,
}

/// What the orchestrator reports when a stage fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
    pub stack: Option<String>,
}

impl StageFailure {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Most recent attempt of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the attempt was logged. Completion does not move it.
    pub timestamp: DateTime<Utc>,

    /// Set once the completion signal arrives; an entry never goes back to false.
    pub completed: bool,

    #[serde(default)]
    pub skipped: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,

    /// Write order within the record (higher = logged later).
    pub seq: u64,
}

impl LogEntry {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Stage -> latest `LogEntry` map.
///
/// Design:
/// - At most one live entry per stage; a new attempt replaces the old one.
/// - With `history_limit > 0` the replaced entries are kept per stage
///   (oldest first) so retries stay visible. The live entry is unaffected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLog {
    entries: BTreeMap<Stage, LogEntry>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    history: BTreeMap<Stage, Vec<LogEntry>>,

    #[serde(default)]
    next_seq: u64,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) `stage`. Replaces any previous entry.
    pub fn start(&mut self, stage: Stage, now: DateTime<Utc>, history_limit: usize) {
        self.replace(stage, now, false, false, None, history_limit);
    }

    /// Completion signal.
    ///
    /// With `base = Some(start)` and an existing entry for `start`, that entry
    /// is marked completed in place and no `stage` entry is created. Otherwise
    /// a completed entry is written under `stage` itself. Returns the stage
    /// whose entry now carries the completion.
    pub fn complete(
        &mut self,
        stage: Stage,
        base: Option<Stage>,
        now: DateTime<Utc>,
        history_limit: usize,
    ) -> Stage {
        if let Some(base) = base
            && let Some(entry) = self.entries.get_mut(&base)
        {
            if !entry.completed {
                entry.completed = true;
                entry.completed_at = Some(now);
            }
            return base;
        }

        self.replace(stage, now, true, false, None, history_limit);
        if let Some(entry) = self.entries.get_mut(&stage) {
            entry.completed_at = Some(now);
        }
        stage
    }

    /// The orchestrator chose not to run `stage`.
    pub fn skip(&mut self, stage: Stage, now: DateTime<Utc>, history_limit: usize) {
        self.replace(stage, now, false, true, None, history_limit);
    }

    /// Record a failure under `failure.stage`, replacing any previous entry.
    pub fn fail(&mut self, failure: StageFailure, now: DateTime<Utc>, history_limit: usize) {
        let error = StageError {
            message: failure.message,
            stack: failure.stack,
            stage: failure.stage,
        };
        self.replace(failure.stage, now, false, false, Some(error), history_limit);
    }

    fn replace(
        &mut self,
        stage: Stage,
        now: DateTime<Utc>,
        completed: bool,
        skipped: bool,
        error: Option<StageError>,
        history_limit: usize,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = LogEntry {
            timestamp: now,
            completed,
            skipped,
            completed_at: None,
            error,
            seq,
        };

        if let Some(previous) = self.entries.insert(stage, entry) {
            self.archive(stage, previous, history_limit);
        }
    }

    fn archive(&mut self, stage: Stage, previous: LogEntry, history_limit: usize) {
        if history_limit == 0 {
            return;
        }
        let attempts = self.history.entry(stage).or_default();
        attempts.push(previous);
        if attempts.len() > history_limit {
            let overflow = attempts.len() - history_limit;
            attempts.drain(..overflow);
        }
    }

    pub fn get(&self, stage: Stage) -> Option<&LogEntry> {
        self.entries.get(&stage)
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.entries.contains_key(&stage)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, &LogEntry)> {
        self.entries.iter().map(|(stage, entry)| (*stage, entry))
    }

    /// Any entry (or the entry for `stage`) carrying an error?
    pub fn has_errors(&self, stage: Option<Stage>) -> bool {
        match stage {
            Some(stage) => self.entries.get(&stage).is_some_and(LogEntry::has_error),
            None => self.entries.values().any(LogEntry::has_error),
        }
    }

    /// Stage with the latest timestamp. Ties go to the entry written last.
    pub fn last_stage(&self) -> Option<Stage> {
        self.entries
            .iter()
            .max_by_key(|(_, entry)| (entry.timestamp, entry.seq))
            .map(|(stage, _)| *stage)
    }

    /// Entries carrying an error, in the order they were logged.
    pub fn errors(&self) -> Vec<(Stage, StageError)> {
        let mut failed: Vec<(&Stage, &LogEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_error())
            .collect();
        failed.sort_by_key(|(_, entry)| entry.seq);
        failed
            .into_iter()
            .filter_map(|(stage, entry)| entry.error.clone().map(|error| (*stage, error)))
            .collect()
    }

    /// Most recently logged error.
    pub fn last_error(&self) -> Option<(Stage, StageError)> {
        self.errors().pop()
    }

    /// Archived attempts of `stage` followed by the live entry.
    pub fn attempts(&self, stage: Stage) -> Vec<LogEntry> {
        let mut attempts = self.history.get(&stage).cloned().unwrap_or_default();
        if let Some(latest) = self.entries.get(&stage) {
            attempts.push(latest.clone());
        }
        attempts
    }
}
