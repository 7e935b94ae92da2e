//! Start/done pairing table.
//!
//! `log_stage_done` needs to know which "in progress" entry a completion
//! signal closes. That relation is declared here as an explicit table and
//! checked once when the tracker is built, so a done stage without a partner
//! is a listed exception rather than a silent fallback.

use std::collections::{HashMap, HashSet};

use super::stage::{Stage, StageKind};

/// Built-in pairs as `(done, start)`.
pub const STANDARD_PAIRS: &[(Stage, Stage)] = &[
    (Stage::CleanupDone, Stage::Cleanup),
    (Stage::RenameDone, Stage::Rename),
    (Stage::ExtractDone, Stage::Extract),
    (Stage::MovingAttachmentDone, Stage::MovingAttachment),
    (Stage::ClassifyDone, Stage::Classify),
    (Stage::TaggingDone, Stage::Tagging),
    (Stage::ApplyingTagsDone, Stage::ApplyingTags),
    (Stage::RecommendNameDone, Stage::RecommendName),
    (Stage::ApplyingNameDone, Stage::ApplyingName),
    (Stage::FormattingDone, Stage::Formatting),
    (Stage::MovingDone, Stage::Moving),
    (Stage::ValidateDone, Stage::Validate),
    (Stage::ContainerDone, Stage::Container),
    (Stage::AppendDone, Stage::Append),
    (Stage::FetchYoutubeDone, Stage::FetchYoutube),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("stage {0:?} is not a completion stage")]
    NotADoneStage(Stage),

    #[error("stage {0:?} is not a start stage")]
    NotAStartStage(Stage),

    #[error("completion stage {0:?} is paired more than once")]
    DuplicateDone(Stage),

    #[error("start stage {0:?} is paired more than once")]
    DuplicateStart(Stage),

    #[error("completion stage {0:?} has no start stage and is not declared unpaired")]
    Unpaired(Stage),
}

/// Bidirectional done <-> start map.
#[derive(Debug, Clone)]
pub struct PairingTable {
    done_to_start: HashMap<Stage, Stage>,
    start_to_done: HashMap<Stage, Stage>,
}

impl PairingTable {
    /// Build and validate a table.
    ///
    /// Every `StageKind::Done` stage must either appear in `pairs` or be listed
    /// in `allow_unpaired`. Unpaired completions are logged under their own key.
    pub fn from_pairs(
        pairs: &[(Stage, Stage)],
        allow_unpaired: &[Stage],
    ) -> Result<Self, PairingError> {
        let mut done_to_start = HashMap::with_capacity(pairs.len());
        let mut start_to_done = HashMap::with_capacity(pairs.len());

        for &(done, start) in pairs {
            if done.kind() != StageKind::Done {
                return Err(PairingError::NotADoneStage(done));
            }
            if start.kind() != StageKind::Start {
                return Err(PairingError::NotAStartStage(start));
            }
            if done_to_start.insert(done, start).is_some() {
                return Err(PairingError::DuplicateDone(done));
            }
            if start_to_done.insert(start, done).is_some() {
                return Err(PairingError::DuplicateStart(start));
            }
        }

        let allowed: HashSet<Stage> = allow_unpaired.iter().copied().collect();
        if let Some(missing) = Stage::ALL.iter().copied().find(|s| {
            s.kind() == StageKind::Done && !done_to_start.contains_key(s) && !allowed.contains(s)
        }) {
            return Err(PairingError::Unpaired(missing));
        }

        Ok(Self {
            done_to_start,
            start_to_done,
        })
    }

    /// The built-in table (`STANDARD_PAIRS`, no unpaired completions).
    pub fn standard() -> Result<Self, PairingError> {
        Self::from_pairs(STANDARD_PAIRS, &[])
    }

    /// Start stage closed by `done`. Only completion stages are looked up.
    pub fn start_for(&self, done: Stage) -> Option<Stage> {
        if done.kind() != StageKind::Done {
            return None;
        }
        self.done_to_start.get(&done).copied()
    }

    /// Completion stage that closes `start`.
    pub fn done_for(&self, start: Stage) -> Option<Stage> {
        self.start_to_done.get(&start).copied()
    }

    pub fn len(&self) -> usize {
        self.done_to_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done_to_start.is_empty()
    }
}
