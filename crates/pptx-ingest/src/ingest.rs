//! The slide assembler: drives validation, loading, metadata and the
//! per-slide parsers, and turns their output into a [`ProcessingResult`].

use std::time::Instant;

use crate::config::ProcessOptions;
use crate::error::{IngestError, IngestWarning};
use crate::ir::{ImageReport, Layout, LayoutKind, ProcessingResult, ProjectMetadata, Slide, Timeline};
use crate::media::MediaServices;
use crate::package::PackageArchive;
use crate::parser::images::{extract_images_until, slide_images};
use crate::parser::layout::{LayoutInfo, detect_layout};
use crate::parser::metadata::extract_metadata;
use crate::parser::text::{SlideText, extract_notes, extract_text};
use crate::progress::{ProgressEvent, ProgressStage, Reporter};
use crate::validate::validate;

/// Pipeline states of one `process` call, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Validating,
    Loading,
    ExtractingMetadata,
    ProcessingSlides,
    Finalizing,
}

/// Runs presentation packages through the ingestion pipeline.
///
/// An `Ingestor` holds no per-call state; one instance can serve any number
/// of concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    media: MediaServices,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(media: MediaServices) -> Self {
        Self { media }
    }

    pub fn media(&self) -> &MediaServices {
        &self.media
    }

    pub fn process(&self, data: &[u8], project_id: &str, options: &ProcessOptions) -> ProcessingResult {
        self.process_with_progress(data, project_id, options, |_| {})
    }

    /// Process `data`, reporting progress to `on_progress`.
    ///
    /// Stages arrive in the order `initializing`, `parsing`,
    /// `processing-slides` (once up front, then once per slide),
    /// `finalizing`. Never panics on bad input: every failure becomes
    /// `success: false` with empty slides and thumbnails.
    pub fn process_with_progress(
        &self,
        data: &[u8],
        project_id: &str,
        options: &ProcessOptions,
        mut on_progress: impl FnMut(ProgressEvent),
    ) -> ProcessingResult {
        let span = tracing::info_span!("process", project_id, size = data.len());
        let _guard = span.enter();
        let started = Instant::now();

        let mut reporter = Reporter::new(&mut on_progress);
        let run = Run {
            ingestor: self,
            options,
            project_id,
            deadline: options.deadline.map(|d| started + d),
        };

        match run.execute(data, &mut reporter) {
            Ok(result) => {
                tracing::info!(
                    slides = result.slides.len(),
                    warnings = result.warnings.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "presentation processed"
                );
                result
            }
            Err(err) => {
                tracing::warn!(kind = err.kind().label(), error = %err, "presentation rejected");
                ProcessingResult::failure(&err)
            }
        }
    }
}

/// One invocation's borrowed context.
struct Run<'a> {
    ingestor: &'a Ingestor,
    options: &'a ProcessOptions,
    project_id: &'a str,
    deadline: Option<Instant>,
}

impl Run<'_> {
    fn enter(&self, state: State) -> Result<(), IngestError> {
        self.checkpoint()?;
        tracing::debug!(?state, "pipeline state");
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), IngestError> {
        if self.options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(IngestError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(IngestError::DeadlineExceeded);
        }
        Ok(())
    }

    fn execute(&self, data: &[u8], reporter: &mut Reporter<'_>) -> Result<ProcessingResult, IngestError> {
        reporter.stage(ProgressStage::Initializing);
        let mut warnings = Vec::new();
        if let Some(d) = self.options.default_duration
            && !(d.is_finite() && d > 0.0)
        {
            warnings.push(IngestWarning::new(
                "options.defaultDuration",
                format!("{d} is not a positive number of seconds; using {}", self.options.slide_duration()),
            ));
        }

        self.enter(State::Validating)?;
        validate(data)?;

        reporter.stage(ProgressStage::Parsing);
        self.enter(State::Loading)?;
        let archive = PackageArchive::open(data)?;

        self.enter(State::ExtractingMetadata)?;
        let metadata = extract_metadata(&archive, data.len() as u64);
        let slide_count = metadata.slide_count;
        reporter.set_total(slide_count);

        self.enter(State::ProcessingSlides)?;
        reporter.stage(ProgressStage::ProcessingSlides);
        let mut slides = Vec::with_capacity(slide_count as usize);
        for n in 1..=slide_count {
            self.checkpoint()?;
            let slide = match self.assemble_slide(&archive, n, &mut warnings) {
                Ok(slide) => slide,
                Err(e) if self.options.strict_slides || is_abort(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!(slide = n, error = %e, "slide degraded to placeholder");
                    warnings.push(IngestWarning::new(format!("slide {n}"), e.to_string()));
                    self.placeholder_slide(n)
                }
            };
            slides.push(slide);
            reporter.slide_done(n);
        }

        self.enter(State::Finalizing)?;
        reporter.stage(ProgressStage::Finalizing);
        let images = extract_images_until(
            &archive,
            self.project_id,
            self.options.images,
            &self.ingestor.media,
            || self.checkpoint().is_err(),
        );
        self.checkpoint()?;

        Ok(finish(metadata, slides, images, warnings))
    }

    fn assemble_slide(
        &self,
        archive: &PackageArchive,
        n: u32,
        warnings: &mut Vec<IngestWarning>,
    ) -> Result<Slide, IngestError> {
        let (text, layout) = rayon::join(|| extract_text(archive, n), || detect_layout(archive, n));
        let text: SlideText = text?;
        let layout: LayoutInfo = layout?;
        tracing::debug!(
            slide = n,
            words = text.word_count,
            layout = layout.layout.kind.display_name(),
            "slide parsed"
        );

        // Notes and picture lists are secondary: a failure there keeps the slide.
        let notes = extract_notes(archive, n).unwrap_or_else(|e| {
            warnings.push(IngestWarning::new(format!("slide {n} notes"), e.to_string()));
            String::new()
        });
        let images = slide_images(archive, n).unwrap_or_else(|e| {
            warnings.push(IngestWarning::new(format!("slide {n} images"), e.to_string()));
            Vec::new()
        });

        let (title, content) = split_title(&text.plain_text, layout.title.as_deref(), n);
        Ok(Slide {
            id: Slide::slide_id(n),
            slide_number: n,
            title,
            content,
            bullet_points: text.bullet_points,
            text_boxes: text.text_boxes,
            duration: self.options.slide_duration(),
            transition: self.options.slide_transition(),
            layout: layout.layout,
            declared_transition: layout.declared_transition,
            notes,
            images,
        })
    }

    fn placeholder_slide(&self, n: u32) -> Slide {
        Slide {
            id: Slide::slide_id(n),
            slide_number: n,
            title: format!("Slide {n}"),
            content: String::new(),
            bullet_points: Vec::new(),
            text_boxes: Vec::new(),
            duration: self.options.slide_duration(),
            transition: self.options.slide_transition(),
            layout: Layout {
                name: LayoutKind::Blank.display_name().to_string(),
                kind: LayoutKind::Blank,
            },
            declared_transition: None,
            notes: String::new(),
            images: Vec::new(),
        }
    }
}

/// Cancellation and deadline end the whole call even in tolerant mode.
fn is_abort(err: &IngestError) -> bool {
    matches!(err, IngestError::Cancelled | IngestError::DeadlineExceeded)
}

/// First non-empty line is the title, the rest is content. Without any
/// text the layout's title placeholder, then `Slide <n>`, stands in.
fn split_title(plain_text: &str, layout_title: Option<&str>, n: u32) -> (String, String) {
    let mut lines = plain_text.lines().map(str::trim).filter(|l| !l.is_empty());
    match lines.next() {
        Some(first) => (first.to_string(), lines.collect::<Vec<_>>().join("\n")),
        None => (
            layout_title
                .map(str::to_string)
                .unwrap_or_else(|| format!("Slide {n}")),
            String::new(),
        ),
    }
}

fn finish(
    metadata: ProjectMetadata,
    slides: Vec<Slide>,
    images: ImageReport,
    warnings: Vec<IngestWarning>,
) -> ProcessingResult {
    let thumbnails = slides.iter().map(Slide::thumbnail_path).collect();
    let timeline = Timeline::from_slides(&slides);
    ProcessingResult {
        success: true,
        error: None,
        error_kind: None,
        metadata: Some(metadata),
        slides,
        thumbnails,
        timeline: Some(timeline),
        images: Some(images),
        warnings,
    }
}
