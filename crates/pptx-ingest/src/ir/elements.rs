use serde::Serialize;

use super::style::{Layout, Transition};

/// Axis-aligned rectangle in points (1 pt = 1/72 inch), measured from the
/// slide's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert DrawingML EMUs to points (12700 EMU per point).
pub(crate) fn emu_to_pt(emu: i64) -> f64 {
    emu as f64 / 12700.0
}

impl Rect {
    pub(crate) fn from_emu(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self {
            x: emu_to_pt(x),
            y: emu_to_pt(y),
            width: emu_to_pt(cx),
            height: emu_to_pt(cy),
        }
    }
}

/// A text-bearing shape on a slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBox {
    /// Stable within a package: derived from the slide number and the
    /// shape's drawing id.
    pub id: String,
    pub text: String,
    /// Absent when the shape inherits its geometry from the layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
}

/// What a shape on the slide is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Title,
    Subtitle,
    Body,
    Text,
    Picture,
    Table,
    Chart,
    Diagram,
    Media,
    Connector,
    Shape,
}

/// Geometry of one shape, used to classify the slide layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutElement {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Top-left corner in points, when declared on the slide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<(f64, f64)>,
    /// Width and height in points, when declared on the slide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<(f64, f64)>,
}

/// One entry of the assembled timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// `slide-<n>`.
    pub id: String,
    /// 1-based and gapless across a result.
    pub slide_number: u32,
    pub title: String,
    pub content: String,
    pub bullet_points: Vec<String>,
    pub text_boxes: Vec<TextBox>,
    /// Seconds on screen; always positive.
    pub duration: f64,
    pub transition: Transition,
    pub layout: Layout,
    /// Transition the slide itself declares, if any. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_transition: Option<Transition>,
    /// Speaker notes.
    pub notes: String,
    /// Media parts referenced by this slide, in document order.
    pub images: Vec<String>,
}

impl Slide {
    pub fn slide_id(slide_number: u32) -> String {
        format!("slide-{slide_number}")
    }

    /// Path of this slide's thumbnail. Fixed by convention whether or not a
    /// raster was rendered.
    pub fn thumbnail_path(&self) -> String {
        format!("/thumbnails/{}.png", self.id)
    }
}
