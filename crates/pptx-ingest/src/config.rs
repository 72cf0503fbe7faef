use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::ir::Transition;

/// Largest upload accepted by the validator (100 MiB).
pub const MAX_ARTIFACT_SIZE: u64 = 100 * 1024 * 1024;

/// Upper bound on the number of entries the package loader will read.
pub const MAX_ARCHIVE_ENTRIES: usize = 10_000;

/// Upper bound on the total decompressed size of all entries (512 MiB).
pub const MAX_UNCOMPRESSED_SIZE: u64 = 512 * 1024 * 1024;

/// Slide duration in seconds when the caller does not provide one.
pub const DEFAULT_SLIDE_DURATION: f64 = 5.0;

/// Thumbnail dimensions in pixels. Thumbnails are resized to exactly this size.
pub const THUMBNAIL_WIDTH: u32 = 320;
pub const THUMBNAIL_HEIGHT: u32 = 180;

/// What the image pass should do with each embedded image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Hand images (and thumbnails, if generated) to the configured uploader.
    pub upload_enabled: bool,
    /// Resize each image into a `THUMBNAIL_WIDTH`x`THUMBNAIL_HEIGHT` thumbnail.
    pub generate_thumbnails: bool,
}

/// Options controlling a single `process` invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Duration applied to every slide, in seconds. Must be finite and positive.
    pub default_duration: Option<f64>,
    /// Transition applied to every slide. Defaults to a 0.5s fade.
    pub transition: Option<Transition>,
    pub images: ImageOptions,
    /// Treat any per-slide extraction failure as fatal for the whole call.
    pub strict_slides: bool,
    /// Wall-clock budget for the whole invocation.
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl ProcessOptions {
    /// The duration every slide receives, falling back to the default for
    /// missing or unusable values.
    pub fn slide_duration(&self) -> f64 {
        match self.default_duration {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => DEFAULT_SLIDE_DURATION,
        }
    }

    pub fn slide_transition(&self) -> Transition {
        self.transition.clone().unwrap_or_default()
    }
}

/// Cooperative cancellation flag shared between the caller and a running
/// invocation. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
