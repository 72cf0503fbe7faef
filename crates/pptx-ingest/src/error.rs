use serde::Serialize;
use thiserror::Error;

/// Stable tag for every failure the pipeline can report.
///
/// Callers branch on the kind; the human-readable text comes from
/// [`ErrorKind::message`] and may change without notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    TooLarge,
    BadSignature,
    ArchiveCorrupt,
    SlideOutOfRange,
    Processing,
    Cancelled,
    DeadlineExceeded,
}

impl ErrorKind {
    /// Message catalog for display.
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "artifact not found or empty",
            Self::TooLarge => "artifact too large",
            Self::BadSignature => "invalid file format: archive signature not found",
            Self::ArchiveCorrupt => "invalid presentation package",
            Self::SlideOutOfRange => "slide not found",
            Self::Processing => "processing failed",
            Self::Cancelled => "processing cancelled",
            Self::DeadlineExceeded => "processing deadline exceeded",
        }
    }

    /// Short snake_case label, used for metrics and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::TooLarge => "too_large",
            Self::BadSignature => "bad_signature",
            Self::ArchiveCorrupt => "archive_corrupt",
            Self::SlideOutOfRange => "slide_out_of_range",
            Self::Processing => "processing",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Structural problems detected before the archive is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("artifact not found or empty: {0}")]
    NotFound(String),

    #[error("artifact not found or empty: zero-length upload")]
    Empty,

    #[error("artifact too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("invalid file format: archive signature not found")]
    BadSignature,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Empty => ErrorKind::NotFound,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::BadSignature => ErrorKind::BadSignature,
        }
    }
}

/// The artifact passed validation but is not a usable presentation package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("invalid presentation package: {0}")]
    Corrupt(String),

    #[error("invalid presentation package: missing required entry `{0}`")]
    MissingEntry(&'static str),

    #[error("invalid presentation package: more than {0} entries")]
    TooManyEntries(usize),

    #[error("invalid presentation package: uncompressed content exceeds {0} bytes")]
    TooLargeUncompressed(u64),
}

/// Errors that can occur while ingesting a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("slide not found: slide {slide_number} requested, package has {slide_count}")]
    SlideNotFound { slide_number: u32, slide_count: u32 },

    #[error("processing failed: {0}")]
    Processing(String),

    #[error("processing failed: malformed XML in `{part}`: {reason}")]
    Xml { part: String, reason: String },

    #[error("processing cancelled")]
    Cancelled,

    #[error("processing deadline exceeded")]
    DeadlineExceeded,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(e) => e.kind(),
            Self::Archive(_) => ErrorKind::ArchiveCorrupt,
            Self::SlideNotFound { .. } => ErrorKind::SlideOutOfRange,
            Self::Processing(_) | Self::Xml { .. } => ErrorKind::Processing,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    pub(crate) fn xml(part: &str, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Failures reported by the image resize and upload capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(String),

    #[error("image resize failed: {0}")]
    Resize(String),

    #[error("upload of `{key}` failed: {reason}")]
    Upload { key: String, reason: String },

    #[error("no {0} configured")]
    Unavailable(&'static str),

    #[error("skipped, processing stopped")]
    Stopped,
}

/// A non-fatal warning emitted when an element cannot be fully processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestWarning {
    /// Description of the element that caused the warning.
    pub element: String,
    /// Reason the element could not be processed.
    pub reason: String,
}

impl IngestWarning {
    pub fn new(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.element, self.reason)
    }
}
