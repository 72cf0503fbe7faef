//! Presentation-package ingestion.
//!
//! Validates an uploaded PPTX deck, opens it as an OOXML package, and turns
//! it into an ordered slide timeline: per-slide title, content, bullets,
//! positioned text boxes, layout archetype, speaker notes and images, plus
//! project metadata and an image report.
//!
//! ```no_run
//! use pptx_ingest::config::ProcessOptions;
//!
//! let data = std::fs::read("deck.pptx").unwrap();
//! let result = pptx_ingest::process(&data, "project-1", &ProcessOptions::default());
//! if result.success {
//!     for slide in &result.slides {
//!         println!("{}: {}", slide.slide_number, slide.title);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod ir;
pub mod media;
pub mod package;
pub mod parser;
pub mod progress;
pub mod validate;

use std::path::Path;

use config::ProcessOptions;
use ingest::Ingestor;
use ir::ProcessingResult;
use progress::ProgressEvent;

pub use error::{ErrorKind, IngestError, ValidationError};
pub use validate::{validate, validate_path};

/// Process an in-memory artifact with the default media services.
pub fn process(data: &[u8], project_id: &str, options: &ProcessOptions) -> ProcessingResult {
    Ingestor::new().process(data, project_id, options)
}

/// [`process`] with a progress callback.
pub fn process_with_progress(
    data: &[u8],
    project_id: &str,
    options: &ProcessOptions,
    on_progress: impl FnMut(ProgressEvent),
) -> ProcessingResult {
    Ingestor::new().process_with_progress(data, project_id, options, on_progress)
}

/// Read and process the file at `path`. A missing or unreadable file is a
/// structured `NotFound` failure, not an `Err`.
pub fn process_path(path: impl AsRef<Path>, project_id: &str, options: &ProcessOptions) -> ProcessingResult {
    match validate_path(path) {
        Ok(data) => process(&data, project_id, options),
        Err(err) => ProcessingResult::failure(&err.into()),
    }
}
