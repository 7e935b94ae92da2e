//! Pipeline stage vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What role a stage identifier plays in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// "In progress" signal of a pipeline step.
    Start,

    /// Terminal ("...done") signal of a pipeline step.
    Done,

    /// Key under which failures of a step are filed. Never started or completed.
    ErrorBucket,

    /// Standalone marker with no completion variant.
    Marker,
}

/// A named step of the organization pipeline.
///
/// Closed vocabulary: start stages, their done variants, error buckets and
/// the `Completed` marker. Which done variant completes which start stage is
/// NOT derived from the names; see `PairingTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Cleanup,
    CleanupDone,
    Rename,
    RenameDone,
    Extract,
    ExtractDone,
    MovingAttachment,
    MovingAttachmentDone,
    Classify,
    ClassifyDone,
    Tagging,
    TaggingDone,
    ApplyingTags,
    ApplyingTagsDone,
    RecommendName,
    RecommendNameDone,
    ApplyingName,
    ApplyingNameDone,
    Formatting,
    FormattingDone,
    Moving,
    MovingDone,
    Validate,
    ValidateDone,
    Container,
    ContainerDone,
    Append,
    AppendDone,
    FetchYoutube,
    FetchYoutubeDone,

    Completed,

    ErrorCleanup,
    ErrorRename,
    ErrorExtract,
    ErrorMovingAttachment,
    ErrorClassify,
    ErrorTagging,
    ErrorFormatting,
    ErrorMoving,
    ErrorAppend,
    ErrorValidate,
    ErrorContainer,
    ErrorFetchYoutube,
    ErrorComplete,
}

impl Stage {
    /// Every stage, in declaration order.
    pub const ALL: [Stage; 44] = [
        Stage::Cleanup,
        Stage::CleanupDone,
        Stage::Rename,
        Stage::RenameDone,
        Stage::Extract,
        Stage::ExtractDone,
        Stage::MovingAttachment,
        Stage::MovingAttachmentDone,
        Stage::Classify,
        Stage::ClassifyDone,
        Stage::Tagging,
        Stage::TaggingDone,
        Stage::ApplyingTags,
        Stage::ApplyingTagsDone,
        Stage::RecommendName,
        Stage::RecommendNameDone,
        Stage::ApplyingName,
        Stage::ApplyingNameDone,
        Stage::Formatting,
        Stage::FormattingDone,
        Stage::Moving,
        Stage::MovingDone,
        Stage::Validate,
        Stage::ValidateDone,
        Stage::Container,
        Stage::ContainerDone,
        Stage::Append,
        Stage::AppendDone,
        Stage::FetchYoutube,
        Stage::FetchYoutubeDone,
        Stage::Completed,
        Stage::ErrorCleanup,
        Stage::ErrorRename,
        Stage::ErrorExtract,
        Stage::ErrorMovingAttachment,
        Stage::ErrorClassify,
        Stage::ErrorTagging,
        Stage::ErrorFormatting,
        Stage::ErrorMoving,
        Stage::ErrorAppend,
        Stage::ErrorValidate,
        Stage::ErrorContainer,
        Stage::ErrorFetchYoutube,
        Stage::ErrorComplete,
    ];

    pub fn kind(self) -> StageKind {
        use Stage::*;
        match self {
            Cleanup | Rename | Extract | MovingAttachment | Classify | Tagging | ApplyingTags
            | RecommendName | ApplyingName | Formatting | Moving | Validate | Container
            | Append | FetchYoutube => StageKind::Start,

            CleanupDone | RenameDone | ExtractDone | MovingAttachmentDone | ClassifyDone
            | TaggingDone | ApplyingTagsDone | RecommendNameDone | ApplyingNameDone
            | FormattingDone | MovingDone | ValidateDone | ContainerDone | AppendDone
            | FetchYoutubeDone => StageKind::Done,

            Completed => StageKind::Marker,

            ErrorCleanup | ErrorRename | ErrorExtract | ErrorMovingAttachment | ErrorClassify
            | ErrorTagging | ErrorFormatting | ErrorMoving | ErrorAppend | ErrorValidate
            | ErrorContainer | ErrorFetchYoutube | ErrorComplete => StageKind::ErrorBucket,
        }
    }

    /// Error bucket an orchestrator files failures of this stage under.
    pub fn error_bucket(self) -> Option<Stage> {
        use Stage::*;
        match self {
            Cleanup => Some(ErrorCleanup),
            Rename => Some(ErrorRename),
            Extract => Some(ErrorExtract),
            MovingAttachment => Some(ErrorMovingAttachment),
            Classify => Some(ErrorClassify),
            Tagging => Some(ErrorTagging),
            Formatting => Some(ErrorFormatting),
            Moving => Some(ErrorMoving),
            Append => Some(ErrorAppend),
            Validate => Some(ErrorValidate),
            Container => Some(ErrorContainer),
            FetchYoutube => Some(ErrorFetchYoutube),
            Completed => Some(ErrorComplete),
            _ => None,
        }
    }

    /// Progress text shown to users.
    pub fn label(self) -> &'static str {
        use Stage::*;
        match self {
            Cleanup => "Cleaning up file...",
            CleanupDone => "File cleaned up",
            Rename => "Renaming file...",
            RenameDone => "File renamed",
            Extract => "Extracting content...",
            ExtractDone => "Content extracted",
            MovingAttachment => "Moving attachments...",
            MovingAttachmentDone => "Attachments moved",
            Classify => "Analyzing document type...",
            ClassifyDone => "Document type identified",
            Tagging => "Generating tags...",
            TaggingDone => "Tags generated",
            ApplyingTags => "Applying tags...",
            ApplyingTagsDone => "Tags applied",
            RecommendName => "Generating file name...",
            RecommendNameDone => "File name generated",
            ApplyingName => "Applying new name...",
            ApplyingNameDone => "New name applied",
            Formatting => "Formatting content...",
            FormattingDone => "Content formatted",
            Moving => "Moving to final location...",
            MovingDone => "File moved successfully",
            Validate => "Validating document...",
            ValidateDone => "Document validated",
            Container => "Creating document container...",
            ContainerDone => "Container created",
            Append => "Appending content...",
            AppendDone => "Content appended",
            FetchYoutube => "Fetching YouTube transcript...",
            FetchYoutubeDone => "YouTube transcript fetched",
            Completed => "Processing completed",
            ErrorCleanup => "Failed to clean up file",
            ErrorRename => "Failed to rename file",
            ErrorExtract => "Failed to extract content",
            ErrorMovingAttachment => "Failed to move attachments",
            ErrorClassify => "Failed to analyze document type",
            ErrorTagging => "Failed to generate tags",
            ErrorFormatting => "Failed to format content",
            ErrorMoving => "Failed to move file",
            ErrorAppend => "Failed to append content",
            ErrorValidate => "Failed to validate document",
            ErrorContainer => "Failed to create container",
            ErrorFetchYoutube => "Failed to fetch YouTube transcript",
            ErrorComplete => "Processing failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
