use chrono::{DateTime, Utc};
use serde::Serialize;

use super::elements::Slide;
use crate::error::{ErrorKind, IngestError, IngestWarning};

/// Package-level properties of an ingested presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    /// Empty when the package declares no title.
    pub title: String,
    /// Empty when the package declares no author.
    pub author: String,
    pub subject: String,
    /// `None` when absent or not a valid W3CDTF timestamp.
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Producing application, from `docProps/app.xml`.
    pub application: String,
    /// Length of the presentation's slide id list.
    pub slide_count: u32,
    /// Size of the uploaded artifact in bytes.
    pub file_size: u64,
    pub slide_size: Option<SlideSize>,
}

/// Slide dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlideSize {
    pub width: f64,
    pub height: f64,
}

/// Cumulative playback schedule of the slides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Sum of all slide durations, in seconds.
    pub total_duration: f64,
    pub scenes: Vec<TimelineScene>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineScene {
    pub slide_id: String,
    pub start_time: f64,
    pub duration: f64,
}

impl Timeline {
    pub fn from_slides(slides: &[Slide]) -> Self {
        let mut total_duration = 0.0;
        let scenes = slides
            .iter()
            .map(|slide| {
                let scene = TimelineScene {
                    slide_id: slide.id.clone(),
                    start_time: total_duration,
                    duration: slide.duration,
                };
                total_duration += slide.duration;
                scene
            })
            .collect();
        Self {
            total_duration,
            scenes,
        }
    }
}

/// Outcome of the image pass over a package.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    /// True when every image was processed without error.
    pub success: bool,
    /// Distinct embedded image parts referenced by any slide.
    pub total_images: usize,
    /// Distinct embedded video parts (counted, not processed).
    pub videos: usize,
    /// Distinct embedded audio parts (counted, not processed).
    pub audio: usize,
    pub thumbnails_generated: usize,
    pub uploaded: Vec<UploadedImage>,
    /// One entry per image that could not be fully processed.
    pub errors: Vec<String>,
}

/// An image handed to the upload collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    /// Part name inside the package, e.g. `ppt/media/image1.png`.
    pub media_path: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// The structured value returned by `process`.
///
/// On success `slides`, `thumbnails` and `metadata.slide_count` agree in
/// length. On failure `slides` and `thumbnails` are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProjectMetadata>,
    pub slides: Vec<Slide>,
    pub thumbnails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageReport>,
    pub warnings: Vec<IngestWarning>,
}

impl ProcessingResult {
    pub fn failure(err: &IngestError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            metadata: None,
            slides: Vec::new(),
            thumbnails: Vec::new(),
            timeline: None,
            images: None,
            warnings: Vec::new(),
        }
    }

    /// JSON rendering used by the command-line and HTTP front ends.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Layout, LayoutKind, Transition};

    fn slide(n: u32, duration: f64) -> Slide {
        Slide {
            id: Slide::slide_id(n),
            slide_number: n,
            title: format!("Slide {n}"),
            content: String::new(),
            bullet_points: vec![],
            text_boxes: vec![],
            duration,
            transition: Transition::default(),
            layout: Layout {
                name: "Blank".into(),
                kind: LayoutKind::Blank,
            },
            declared_transition: None,
            notes: String::new(),
            images: vec![],
        }
    }

    #[test]
    fn test_timeline_accumulates_start_times() {
        let timeline = Timeline::from_slides(&[slide(1, 5.0), slide(2, 3.0), slide(3, 4.5)]);
        assert_eq!(timeline.total_duration, 12.5);
        let starts: Vec<f64> = timeline.scenes.iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![0.0, 5.0, 8.0]);
        assert_eq!(timeline.scenes[2].slide_id, "slide-3");
    }

    #[test]
    fn test_timeline_empty() {
        let timeline = Timeline::from_slides(&[]);
        assert_eq!(timeline.total_duration, 0.0);
        assert!(timeline.scenes.is_empty());
    }

    #[test]
    fn test_failure_result_has_no_slide_data() {
        let result = ProcessingResult::failure(&IngestError::Processing("boom".into()));
        assert!(!result.success);
        assert!(result.slides.is_empty());
        assert!(result.thumbnails.is_empty());
        assert_eq!(result.error_kind, Some(ErrorKind::Processing));
        assert_eq!(result.error.as_deref(), Some("processing failed: boom"));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let meta = ProjectMetadata {
            slide_count: 2,
            file_size: 10,
            ..ProjectMetadata::default()
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["slideCount"], 2);
        assert_eq!(value["fileSize"], 10);
        assert!(value["createdAt"].is_null());
    }

    #[test]
    fn test_failure_json_omits_absent_sections() {
        let result = ProcessingResult::failure(&IngestError::Cancelled);
        let json: serde_json::Value = serde_json::from_str(&result.to_json(false).unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorKind"], "cancelled");
        assert!(json.get("metadata").is_none());
        assert_eq!(json["slides"], serde_json::json!([]));
    }
}
