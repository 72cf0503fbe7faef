//! Single-pass scanner over a slide's shape tree.
//!
//! Slide XML (`p:sld`) nests shapes (`p:sp`, `p:pic`, `p:graphicFrame`,
//! `p:cxnSp`) inside `p:spTree`, possibly inside groups. The scanner flattens
//! that tree into [`ShapeInfo`] records carrying placeholder role, geometry,
//! paragraphs and media references, and picks up the slide's declared
//! `p:transition`. Text and layout parsing both work from this output.
//!
//! `mc:Fallback` branches are skipped so content duplicated for older
//! readers is only seen once. The one exception is a transition whose
//! `mc:Choice` branch names no effect we know: its `mc:Fallback` supplies
//! the effect while the Choice keeps its duration.
//!
//! Geometry of grouped shapes is mapped through every enclosing group's
//! `chOff`/`chExt` -> `off`/`ext` transform, so each [`Rect`] is in slide
//! coordinates.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use unicode_normalization::UnicodeNormalization;

use super::{attr_i64, attr_value, push_reference};
use crate::ir::{Rect, Transition, TransitionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShapeKind {
    Shape,
    Picture,
    Table,
    Chart,
    Diagram,
    Frame,
    Connector,
}

/// Placeholder role from `<p:ph type="..">`. A `p:ph` without `type` is a
/// generic content (object) placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaceholderRole {
    Title,
    CenteredTitle,
    Subtitle,
    Body,
    Object,
    Picture,
    Table,
    Chart,
    Media,
    DateTime,
    Footer,
    SlideNumber,
    Other,
}

impl PlaceholderRole {
    fn from_type(ty: Option<&str>) -> Self {
        match ty {
            None | Some("obj") => Self::Object,
            Some("title") => Self::Title,
            Some("ctrTitle") => Self::CenteredTitle,
            Some("subTitle") => Self::Subtitle,
            Some("body") => Self::Body,
            Some("pic") | Some("clipArt") => Self::Picture,
            Some("tbl") => Self::Table,
            Some("chart") | Some("dgm") => Self::Chart,
            Some("media") => Self::Media,
            Some("dt") => Self::DateTime,
            Some("ftr") => Self::Footer,
            Some("sldNum") => Self::SlideNumber,
            Some(_) => Self::Other,
        }
    }

    pub(crate) fn is_title(self) -> bool {
        matches!(self, Self::Title | Self::CenteredTitle)
    }

    /// Placeholders that hold the slide's main content.
    pub(crate) fn is_content(self) -> bool {
        matches!(
            self,
            Self::Body | Self::Object | Self::Picture | Self::Table | Self::Chart | Self::Media
        )
    }

    /// Date, footer and slide-number placeholders repeat on every slide.
    pub(crate) fn is_chrome(self) -> bool {
        matches!(self, Self::DateTime | Self::Footer | Self::SlideNumber)
    }

    /// Body text of these placeholders is bulleted by the master's list
    /// styles unless a paragraph says otherwise.
    fn bullets_by_default(self) -> bool {
        matches!(self, Self::Body | Self::Object)
    }
}

/// Explicit bullet properties on a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BulletMark {
    /// No `a:bu*` element; inherited from the list style.
    Inherited,
    Char(String),
    AutoNumber,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParagraphInfo {
    pub text: String,
    pub bullet: BulletMark,
    /// `lvl` attribute of `a:pPr` (0-based indent level).
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShapeInfo {
    pub kind: ShapeKind,
    /// `id` of the shape's `p:cNvPr`.
    pub id: Option<u32>,
    pub name: String,
    pub placeholder: Option<PlaceholderRole>,
    pub geometry: Option<Rect>,
    pub paragraphs: Vec<ParagraphInfo>,
    /// Relationship ids of embedded pictures (`a:blip r:embed`).
    pub image_rels: Vec<String>,
    /// True for pictures that front a video or audio clip.
    pub has_media: bool,
}

impl ShapeInfo {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            id: None,
            name: String::new(),
            placeholder: None,
            geometry: None,
            paragraphs: Vec::new(),
            image_rels: Vec::new(),
            has_media: false,
        }
    }

    /// Non-empty paragraphs joined with newlines.
    pub(crate) fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn has_text(&self) -> bool {
        self.paragraphs.iter().any(|p| !p.text.trim().is_empty())
    }

    /// Whether `para` of this shape reads as a list item.
    pub(crate) fn is_bullet(&self, para: &ParagraphInfo) -> bool {
        match para.bullet {
            BulletMark::Char(_) | BulletMark::AutoNumber => true,
            BulletMark::None => false,
            BulletMark::Inherited => {
                para.level > 0 || self.placeholder.is_some_and(|r| r.bullets_by_default())
            }
        }
    }
}

/// Everything the scanner extracts from one slide part.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SlideShapes {
    pub shapes: Vec<ShapeInfo>,
    pub transition: Option<Transition>,
}

pub(crate) fn scan_slide(xml: &str) -> Result<SlideShapes, quick_xml::Error> {
    let mut scanner = Scanner::default();
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => scanner.open(&e),
            Event::Empty(e) => {
                scanner.open(&e);
                scanner.close(e.local_name().as_ref());
            }
            Event::End(e) => scanner.close(e.local_name().as_ref()),
            Event::Text(t) if scanner.capturing_text() => {
                scanner.push_text(&t.xml_content()?);
            }
            Event::GeneralRef(r) if scanner.capturing_text() => {
                if let Some(para) = scanner.para.as_mut() {
                    push_reference(&mut para.text, &r);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(SlideShapes {
        shapes: scanner.shapes,
        transition: scanner.transition,
    })
}

#[derive(Default)]
struct Scanner {
    shapes: Vec<ShapeInfo>,
    transition: Option<Transition>,

    /// Nesting depth inside an `mc:Fallback` branch; 0 when outside.
    fallback_depth: u32,
    in_choice: bool,

    /// Enclosing `p:grpSp` transforms, outermost first.
    groups: Vec<GroupTransform>,
    in_group_props: bool,

    shape: Option<ShapeInfo>,
    in_xfrm: bool,
    offset: Option<(i64, i64)>,
    extent: Option<(i64, i64)>,

    para: Option<ParagraphInfo>,
    in_ppr: bool,
    in_text: bool,

    in_transition: bool,
    transition_secs: Option<f64>,
    /// A Choice-branch transition ended without a recognized effect.
    transition_unresolved: bool,
}

/// `a:xfrm` of a group: children are laid out in the `ch_off`/`ch_ext`
/// space, which is stretched onto `off`/`ext` in the parent.
#[derive(Debug, Clone, Copy, Default)]
struct GroupTransform {
    off: Option<(i64, i64)>,
    ext: Option<(i64, i64)>,
    ch_off: Option<(i64, i64)>,
    ch_ext: Option<(i64, i64)>,
}

impl GroupTransform {
    fn read(&mut self, local: &[u8], e: &BytesStart<'_>) {
        let (slot, value) = match local {
            b"off" => (&mut self.off, attr_pair(e, b"x", b"y")),
            b"ext" => (&mut self.ext, attr_pair(e, b"cx", b"cy")),
            b"chOff" => (&mut self.ch_off, attr_pair(e, b"x", b"y")),
            b"chExt" => (&mut self.ch_ext, attr_pair(e, b"cx", b"cy")),
            _ => return,
        };
        if value.is_some() {
            *slot = value;
        }
    }

    /// Map `(x, y, cx, cy)` from child space into the parent's space (EMU).
    fn apply(&self, (x, y, cx, cy): (f64, f64, f64, f64)) -> (f64, f64, f64, f64) {
        let (ox, oy) = self.off.unwrap_or_default();
        let (cox, coy) = self.ch_off.or(self.off).unwrap_or_default();
        let (sx, sy) = match (self.ext, self.ch_ext) {
            (Some((ex, ey)), Some((cex, cey))) => (ratio(ex, cex), ratio(ey, cey)),
            _ => (1.0, 1.0),
        };
        (
            ox as f64 + (x - cox as f64) * sx,
            oy as f64 + (y - coy as f64) * sy,
            cx * sx,
            cy * sy,
        )
    }
}

fn attr_pair(e: &BytesStart<'_>, first: &[u8], second: &[u8]) -> Option<(i64, i64)> {
    attr_i64(e.attributes(), first).zip(attr_i64(e.attributes(), second))
}

fn ratio(ext: i64, child_ext: i64) -> f64 {
    if child_ext > 0 {
        ext as f64 / child_ext as f64
    } else {
        1.0
    }
}

impl Scanner {
    fn capturing_text(&self) -> bool {
        self.fallback_depth == 0 && self.in_text && self.para.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(para) = self.para.as_mut() {
            para.text.push_str(text);
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) {
        let local = e.local_name();
        let local = local.as_ref();

        if self.fallback_depth > 0 {
            self.fallback_depth += 1;
            return;
        }
        if local == b"Fallback" {
            if !(self.shape.is_none() && self.transition_unresolved) {
                self.fallback_depth = 1;
            }
            return;
        }

        if self.shape.is_none() {
            match local {
                b"sp" => self.begin_shape(ShapeKind::Shape),
                b"pic" => self.begin_shape(ShapeKind::Picture),
                b"graphicFrame" => self.begin_shape(ShapeKind::Frame),
                b"cxnSp" => self.begin_shape(ShapeKind::Connector),
                b"grpSp" => self.groups.push(GroupTransform::default()),
                b"grpSpPr" if !self.groups.is_empty() => self.in_group_props = true,
                b"off" | b"ext" | b"chOff" | b"chExt" if self.in_group_props => {
                    if let Some(group) = self.groups.last_mut() {
                        group.read(local, e);
                    }
                }
                b"Choice" => self.in_choice = true,
                b"transition" => {
                    self.in_transition = true;
                    let declared = transition_seconds(e);
                    self.transition_secs = if self.transition_unresolved {
                        self.transition_secs.or(declared)
                    } else {
                        declared
                    };
                }
                _ if self.in_transition => {
                    if let Some(kind) = TransitionKind::from_local_name(local) {
                        self.transition = Some(Transition::new(
                            kind,
                            self.transition_secs.unwrap_or(DEFAULT_DECLARED_SECS),
                        ));
                    }
                }
                _ => {}
            }
            return;
        }

        let Some(shape) = self.shape.as_mut() else {
            return;
        };
        match local {
            b"cNvPr" if shape.id.is_none() => {
                shape.id = attr_i64(e.attributes(), b"id").and_then(|v| u32::try_from(v).ok());
                shape.name = attr_value(e.attributes(), b"name").unwrap_or_default();
            }
            b"ph" => {
                let ty = attr_value(e.attributes(), b"type");
                shape.placeholder = Some(PlaceholderRole::from_type(ty.as_deref()));
            }
            b"xfrm" if shape.geometry.is_none() && self.para.is_none() => {
                self.in_xfrm = true;
                self.offset = None;
                self.extent = None;
            }
            b"off" if self.in_xfrm => {
                self.offset = attr_i64(e.attributes(), b"x").zip(attr_i64(e.attributes(), b"y"));
            }
            b"ext" if self.in_xfrm => {
                self.extent = attr_i64(e.attributes(), b"cx").zip(attr_i64(e.attributes(), b"cy"));
            }
            b"graphicData" => {
                let uri = attr_value(e.attributes(), b"uri").unwrap_or_default();
                shape.kind = if uri.ends_with("/table") {
                    ShapeKind::Table
                } else if uri.ends_with("/chart") {
                    ShapeKind::Chart
                } else if uri.ends_with("/diagram") {
                    ShapeKind::Diagram
                } else {
                    ShapeKind::Frame
                };
            }
            b"blip" => {
                if let Some(rid) = attr_value(e.attributes(), b"embed") {
                    shape.image_rels.push(rid);
                }
            }
            b"videoFile" | b"audioFile" | b"quickTimeFile" | b"wavAudioFile" => {
                shape.has_media = true;
            }
            b"p" => {
                self.para = Some(ParagraphInfo {
                    text: String::new(),
                    bullet: BulletMark::Inherited,
                    level: 0,
                });
            }
            b"pPr" if self.para.is_some() => {
                self.in_ppr = true;
                if let Some(para) = self.para.as_mut() {
                    para.level = attr_i64(e.attributes(), b"lvl")
                        .and_then(|v| u32::try_from(v).ok())
                        .unwrap_or(0);
                }
            }
            b"buChar" | b"buAutoNum" | b"buNone" if self.in_ppr => {
                if let Some(para) = self.para.as_mut() {
                    para.bullet = match local {
                        b"buChar" => {
                            BulletMark::Char(attr_value(e.attributes(), b"char").unwrap_or_default())
                        }
                        b"buAutoNum" => BulletMark::AutoNumber,
                        _ => BulletMark::None,
                    };
                }
            }
            b"t" if self.para.is_some() => self.in_text = true,
            b"br" => self.push_text("\n"),
            b"tab" if self.para.is_some() && !self.in_ppr => self.push_text("\t"),
            _ => {}
        }
    }

    fn close(&mut self, local: &[u8]) {
        if self.fallback_depth > 0 {
            self.fallback_depth -= 1;
            return;
        }

        match local {
            b"transition" if self.shape.is_none() => {
                self.in_transition = false;
                self.transition_unresolved = self.in_choice && self.transition.is_none();
            }
            b"Choice" => self.in_choice = false,
            b"Fallback" => self.transition_unresolved = false,
            b"grpSpPr" => self.in_group_props = false,
            b"grpSp" if self.shape.is_none() => {
                self.groups.pop();
            }
            b"t" => self.in_text = false,
            b"pPr" => self.in_ppr = false,
            b"p" => {
                if let (Some(mut para), Some(shape)) = (self.para.take(), self.shape.as_mut()) {
                    para.text = para.text.nfc().collect();
                    shape.paragraphs.push(para);
                }
            }
            b"xfrm" if self.in_xfrm => {
                self.in_xfrm = false;
                if let (Some(shape), Some((x, y)), Some((cx, cy))) =
                    (self.shape.as_mut(), self.offset, self.extent)
                {
                    let child = (x as f64, y as f64, cx as f64, cy as f64);
                    let (x, y, cx, cy) = self.groups.iter().rev().fold(child, |r, g| g.apply(r));
                    shape.geometry = Some(Rect::from_emu(
                        x.round() as i64,
                        y.round() as i64,
                        cx.round() as i64,
                        cy.round() as i64,
                    ));
                }
            }
            b"sp" | b"pic" | b"graphicFrame" | b"cxnSp" => {
                if self.shape.as_ref().is_some_and(|s| s.kind.opened_by(local))
                    && let Some(shape) = self.shape.take()
                {
                    self.shapes.push(shape);
                    self.para = None;
                    self.in_ppr = false;
                    self.in_text = false;
                    self.in_xfrm = false;
                }
            }
            _ => {}
        }
    }

    fn begin_shape(&mut self, kind: ShapeKind) {
        self.shape = Some(ShapeInfo::new(kind));
    }
}

impl ShapeKind {
    /// Whether a shape of this kind is closed by `</local>`. Frames change
    /// kind once their `a:graphicData` is seen.
    fn opened_by(self, local: &[u8]) -> bool {
        match self {
            Self::Shape => local == b"sp",
            Self::Picture => local == b"pic",
            Self::Connector => local == b"cxnSp",
            Self::Table | Self::Chart | Self::Diagram | Self::Frame => local == b"graphicFrame",
        }
    }
}

/// Transition length when the slide names an effect but no duration.
const DEFAULT_DECLARED_SECS: f64 = 0.75;

/// `p14:dur` (milliseconds) wins over the coarse `spd` attribute.
fn transition_seconds(e: &BytesStart<'_>) -> Option<f64> {
    if let Some(ms) = attr_i64(e.attributes(), b"dur") {
        return Some(ms as f64 / 1000.0);
    }
    match attr_value(e.attributes(), b"spd").as_deref() {
        Some("fast") => Some(0.5),
        Some("med") => Some(0.75),
        Some("slow") => Some(1.0),
        _ => None,
    }
}
