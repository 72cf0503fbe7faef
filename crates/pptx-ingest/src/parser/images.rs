//! Embedded media discovery, thumbnailing and upload.
//!
//! The pass runs once over the whole package. Every per-image problem
//! (missing blob, undecodable data, failed upload) is recorded in
//! [`ImageReport::errors`] and the remaining images are still processed.

use std::collections::HashSet;

use rayon::prelude::*;

use super::shapes::scan_slide;
use crate::config::{ImageOptions, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
use crate::error::{IngestError, MediaError};
use crate::ir::{ImageReport, UploadedImage};
use crate::media::MediaServices;
use crate::package::PackageArchive;

/// An embedded image while it is being processed, borrowing its bytes from
/// the package. Dropped once the pass has handed them to the uploader (or
/// decided not to).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageAsset<'a> {
    /// Part name inside the package.
    pub id: &'a str,
    pub bytes: &'a [u8],
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl<'a> ImageAsset<'a> {
    fn file_name(&self) -> &'a str {
        self.id.rsplit('/').next().unwrap_or(self.id)
    }

    fn stem(&self) -> &'a str {
        let name = self.file_name();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaClass {
    Image,
    Video,
    Audio,
}

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "wma", "aac", "ogg", "mid"];

/// Distinct internal media targets referenced from any slide, in first-seen
/// order, plus the errors hit while reading relationship parts.
fn media_inventory(archive: &PackageArchive) -> (Vec<(String, MediaClass)>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut errors = Vec::new();

    for n in 1..=archive.slide_count() {
        let rels = match archive.slide_part(n).and_then(|part| archive.relationships(part)) {
            Ok(rels) => rels,
            Err(IngestError::SlideNotFound { .. }) => continue,
            Err(e) => {
                errors.push(format!("slide {n}: {e}"));
                continue;
            }
        };
        for rel in rels.into_iter().filter(|r| !r.external) {
            let class = if rel.is_type("image") {
                MediaClass::Image
            } else if rel.is_type("video") {
                MediaClass::Video
            } else if rel.is_type("audio") {
                MediaClass::Audio
            } else if rel.is_type("media") {
                let ext = rel.target.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
                if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
                    MediaClass::Audio
                } else {
                    MediaClass::Video
                }
            } else {
                continue;
            };
            if seen.insert(rel.target.clone()) {
                found.push((rel.target, class));
            }
        }
    }

    (found, errors)
}

/// Run the image pass over every slide of `archive`.
///
/// `total_images` counts distinct image parts referenced by the slides;
/// videos and audio clips are only counted. Thumbnails are exactly
/// [`THUMBNAIL_WIDTH`] x [`THUMBNAIL_HEIGHT`]. Uploads are keyed
/// `projects/<project_id>/images/<file>` and
/// `projects/<project_id>/thumbnails/<stem>.png`.
pub fn extract_images(
    archive: &PackageArchive,
    project_id: &str,
    options: ImageOptions,
    services: &MediaServices,
) -> ImageReport {
    extract_images_until(archive, project_id, options, services, || false)
}

/// [`extract_images`], polling `should_stop` before each image and before
/// each upload. Once it returns true no further media work starts, and every
/// image left unprocessed is reported as skipped.
pub fn extract_images_until(
    archive: &PackageArchive,
    project_id: &str,
    options: ImageOptions,
    services: &MediaServices,
    should_stop: impl Fn() -> bool + Sync,
) -> ImageReport {
    let (inventory, mut errors) = media_inventory(archive);

    let count = |class| inventory.iter().filter(|(_, c)| *c == class).count();
    let mut report = ImageReport {
        total_images: count(MediaClass::Image),
        videos: count(MediaClass::Video),
        audio: count(MediaClass::Audio),
        ..ImageReport::default()
    };

    let outcomes: Vec<ImageOutcome> = inventory
        .par_iter()
        .filter(|(_, class)| *class == MediaClass::Image)
        .map(|(target, _)| process_image(archive, target, project_id, options, services, &should_stop))
        .collect();

    for outcome in outcomes {
        if outcome.thumbnail {
            report.thumbnails_generated += 1;
        }
        report.uploaded.extend(outcome.uploaded);
        errors.extend(outcome.errors);
    }

    for error in &errors {
        tracing::warn!(project_id, error = %error, "image processing problem");
    }
    report.success = errors.is_empty();
    report.errors = errors;
    report
}

#[derive(Default)]
struct ImageOutcome {
    thumbnail: bool,
    uploaded: Option<UploadedImage>,
    errors: Vec<String>,
}

fn process_image(
    archive: &PackageArchive,
    target: &str,
    project_id: &str,
    options: ImageOptions,
    services: &MediaServices,
    should_stop: &(impl Fn() -> bool + Sync),
) -> ImageOutcome {
    let mut outcome = ImageOutcome::default();
    if should_stop() {
        outcome.errors.push(format!("{target}: {}", MediaError::Stopped));
        return outcome;
    }
    let Some(bytes) = archive.entry(target) else {
        outcome.errors.push(format!("{target}: missing from package"));
        return outcome;
    };
    if !options.generate_thumbnails && !options.upload_enabled {
        return outcome;
    }

    let dims = services.resizer.as_ref().and_then(|r| r.dimensions(bytes));
    let asset = ImageAsset {
        id: target,
        bytes,
        width: dims.map(|d| d.0),
        height: dims.map(|d| d.1),
    };

    let mut thumbnail = None;
    if options.generate_thumbnails {
        let resized = match &services.resizer {
            Some(resizer) => resizer.resize(asset.bytes, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT),
            None => Err(MediaError::Unavailable("image resizer")),
        };
        match resized {
            Ok(bytes) => {
                outcome.thumbnail = true;
                thumbnail = Some(bytes);
            }
            Err(e) => outcome.errors.push(format!("{target}: {e}")),
        }
    }

    if options.upload_enabled {
        match upload_asset(&asset, thumbnail.as_deref(), project_id, services, should_stop) {
            Ok((uploaded, thumb_error)) => {
                outcome.uploaded = Some(uploaded);
                outcome.errors.extend(thumb_error.map(|e| format!("{target}: {e}")));
            }
            Err(e) => outcome.errors.push(format!("{target}: {e}")),
        }
    }

    outcome
}

/// Upload the image and, if present, its thumbnail. A failed or skipped
/// thumbnail upload still yields the image record.
fn upload_asset(
    asset: &ImageAsset<'_>,
    thumbnail: Option<&[u8]>,
    project_id: &str,
    services: &MediaServices,
    should_stop: &(impl Fn() -> bool + Sync),
) -> Result<(UploadedImage, Option<MediaError>), MediaError> {
    let uploader = services
        .uploader
        .as_ref()
        .ok_or(MediaError::Unavailable("asset uploader"))?;

    if should_stop() {
        return Err(MediaError::Stopped);
    }
    let url = uploader.upload(
        asset.bytes,
        &format!("projects/{project_id}/images/{}", asset.file_name()),
    )?;

    let thumb_key = format!("projects/{project_id}/thumbnails/{}.png", asset.stem());
    let (thumbnail_url, thumb_error) = match thumbnail {
        Some(_) if should_stop() => (None, Some(MediaError::Stopped)),
        Some(t) => match uploader.upload(t, &thumb_key) {
            Ok(url) => (Some(url), None),
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };

    Ok((
        UploadedImage {
            media_path: asset.id.to_string(),
            url,
            thumbnail_url,
            width: asset.width,
            height: asset.height,
        },
        thumb_error,
    ))
}

/// Media part names referenced by the pictures on slide `slide_number`, in
/// document order, without duplicates.
pub fn slide_images(archive: &PackageArchive, slide_number: u32) -> Result<Vec<String>, IngestError> {
    let part = archive.slide_part(slide_number)?;
    let xml = archive.entry_text(part).unwrap_or_default();
    let scanned = scan_slide(&xml).map_err(|e| IngestError::xml(part, e))?;
    let rels = archive.relationships(part)?;

    let mut seen = HashSet::new();
    Ok(scanned
        .shapes
        .iter()
        .flat_map(|s| s.image_rels.iter())
        .filter_map(|rid| rels.iter().find(|r| &r.id == rid && !r.external))
        .map(|r| r.target.clone())
        .filter(|target| seen.insert(target.clone()))
        .collect())
}
