//! Progress reporting for caller-side progress bars.

use std::fmt;

use serde::Serialize;

/// Named checkpoint of a `process` call. Stages are emitted in declaration
/// order and never go backwards within one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStage {
    Initializing,
    Parsing,
    ProcessingSlides,
    Finalizing,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Parsing => "parsing",
            Self::ProcessingSlides => "processing-slides",
            Self::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// Slides finished so far. Only advances during `ProcessingSlides`.
    pub current: u32,
    /// Slide count, once known (0 before the package is parsed).
    pub total: u32,
}

impl ProgressEvent {
    /// Share of slides processed, as a percentage (0-100). A deck without
    /// slides counts as complete.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return if self.stage >= ProgressStage::ProcessingSlides { 100.0 } else { 0.0 };
        }
        f64::from(self.current) / f64::from(self.total) * 100.0
    }
}

/// Serializes events into a caller callback and drops any event that would
/// move the stage backwards.
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn FnMut(ProgressEvent),
    last: Option<ProgressStage>,
    total: u32,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(ProgressEvent)) -> Self {
        Self {
            sink,
            last: None,
            total: 0,
        }
    }

    pub(crate) fn set_total(&mut self, total: u32) {
        self.total = total;
    }

    pub(crate) fn stage(&mut self, stage: ProgressStage) {
        self.emit(stage, 0);
    }

    pub(crate) fn slide_done(&mut self, current: u32) {
        self.emit(ProgressStage::ProcessingSlides, current);
    }

    fn emit(&mut self, stage: ProgressStage, current: u32) {
        if self.last.is_some_and(|last| stage < last) {
            tracing::debug!(%stage, "dropping out-of-order progress event");
            return;
        }
        self.last = Some(stage);
        let current = if stage == ProgressStage::Finalizing { self.total } else { current };
        (self.sink)(ProgressEvent {
            stage,
            current,
            total: self.total,
        });
    }
}
