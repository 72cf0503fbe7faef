//! Heuristic layout classification.
//!
//! The archetype is inferred from placeholder roles and the number of
//! content-bearing shapes on the slide itself, not matched against the
//! layout part the slide references. That part only contributes a display
//! name.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::attr_value;
use super::shapes::{PlaceholderRole, ShapeInfo, ShapeKind, scan_slide};
use crate::error::IngestError;
use crate::ir::{ElementKind, Layout, LayoutElement, LayoutKind, Transition};
use crate::package::PackageArchive;

/// Layout facts about one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInfo {
    pub layout: Layout,
    /// Every shape on the slide except date/footer/number placeholders,
    /// groups flattened, in document order.
    pub elements: Vec<LayoutElement>,
    /// Text of the title placeholder, if the slide has a non-empty one.
    pub title: Option<String>,
    /// The slide's own `<p:transition>`, if it declares a known effect.
    pub declared_transition: Option<Transition>,
}

/// Classify slide `slide_number` (1-based) and list its shape geometry.
pub fn detect_layout(archive: &PackageArchive, slide_number: u32) -> Result<LayoutInfo, IngestError> {
    let part = archive.slide_part(slide_number)?;
    let xml = archive.entry_text(part).unwrap_or_default();
    let scanned = scan_slide(&xml).map_err(|e| IngestError::xml(part, e))?;

    let shapes: Vec<&ShapeInfo> = scanned
        .shapes
        .iter()
        .filter(|s| !s.placeholder.is_some_and(|r| r.is_chrome()))
        .collect();

    let kind = classify(&shapes);
    let name = layout_part_name(archive, part)?
        .unwrap_or_else(|| kind.display_name().to_string());

    let title = shapes
        .iter()
        .filter(|s| s.placeholder.is_some_and(|r| r.is_title()))
        .map(|s| s.text())
        .find(|t| !t.is_empty());

    let elements = shapes
        .iter()
        .map(|s| LayoutElement {
            kind: element_kind(s),
            position: s.geometry.map(|g| (g.x, g.y)),
            size: s.geometry.map(|g| (g.width, g.height)),
        })
        .collect();

    Ok(LayoutInfo {
        layout: Layout { name, kind },
        elements,
        title,
        declared_transition: scanned.transition,
    })
}

fn classify(shapes: &[&ShapeInfo]) -> LayoutKind {
    let roles = || shapes.iter().filter_map(|s| s.placeholder);
    let centered_title = roles().any(|r| r == PlaceholderRole::CenteredTitle);
    let title = roles().any(|r| r.is_title());
    let subtitle = roles().any(|r| r == PlaceholderRole::Subtitle);
    let content = shapes.iter().filter(|s| is_content(s)).count();

    match (title, content) {
        _ if centered_title => LayoutKind::TitleSlide,
        (true, 0) if subtitle => LayoutKind::TitleSlide,
        (true, 0) => LayoutKind::TitleOnly,
        (true, 1) => LayoutKind::TitleAndContent,
        (true, _) => LayoutKind::TwoContent,
        (false, 0) => LayoutKind::Blank,
        (false, _) => LayoutKind::ContentOnly,
    }
}

/// Shapes that count towards the content side of the layout: content
/// placeholders, pictures and frames, and free text boxes with text.
/// Connectors and empty decorative shapes don't count.
fn is_content(shape: &ShapeInfo) -> bool {
    match shape.placeholder {
        Some(role) => role.is_content(),
        None => match shape.kind {
            ShapeKind::Shape => shape.has_text(),
            ShapeKind::Connector => false,
            _ => true,
        },
    }
}

fn element_kind(shape: &ShapeInfo) -> ElementKind {
    match (shape.placeholder, shape.kind) {
        (Some(r), _) if r.is_title() => ElementKind::Title,
        (Some(PlaceholderRole::Subtitle), _) => ElementKind::Subtitle,
        (_, ShapeKind::Picture) if shape.has_media => ElementKind::Media,
        (_, ShapeKind::Picture) => ElementKind::Picture,
        (_, ShapeKind::Table) => ElementKind::Table,
        (_, ShapeKind::Chart) => ElementKind::Chart,
        (_, ShapeKind::Diagram) => ElementKind::Diagram,
        (_, ShapeKind::Connector) => ElementKind::Connector,
        (Some(_), _) => ElementKind::Body,
        (None, ShapeKind::Shape) if shape.has_text() => ElementKind::Text,
        _ => ElementKind::Shape,
    }
}

/// `name` of the `<p:cSld>` in the layout part the slide is based on.
fn layout_part_name(archive: &PackageArchive, slide_part: &str) -> Result<Option<String>, IngestError> {
    let Some(layout_part) = archive
        .relationships(slide_part)?
        .into_iter()
        .find(|r| r.is_type("slideLayout") && !r.external)
        .map(|r| r.target)
    else {
        return Ok(None);
    };
    let Some(xml) = archive.entry_text(&layout_part) else {
        return Ok(None);
    };

    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"cSld" => {
                return Ok(attr_value(e.attributes(), b"name").filter(|n| !n.trim().is_empty()));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(IngestError::xml(&layout_part, e)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TransitionKind;
    use crate::package::fixtures::deck;

    fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<p:sld xmlns:a="a" xmlns:p="p" xmlns:r="r"><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }

    fn ph(id: u32, ty: &str, text: &str) -> String {
        let ph = if ty.is_empty() {
            r#"<p:ph idx="1"/>"#.to_string()
        } else {
            format!(r#"<p:ph type="{ty}"/>"#)
        };
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Placeholder {id}"/><p:cNvSpPr/><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="127000" y="254000"/><a:ext cx="1270000" cy="635000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
        )
    }

    const PICTURE: &str = r#"<p:pic><p:nvPicPr><p:cNvPr id="9" name="Picture 8"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr/></p:pic>"#;

    fn layout_of(shapes: &str) -> LayoutInfo {
        let archive = deck(&[&slide_xml(shapes)], &[]);
        detect_layout(&archive, 1).unwrap()
    }

    #[test]
    fn test_blank_slide() {
        let info = layout_of("");
        assert_eq!(info.layout.kind, LayoutKind::Blank);
        assert_eq!(info.layout.name, "Blank");
        assert!(info.elements.is_empty());
        assert!(info.title.is_none());
    }

    #[test]
    fn test_title_slide() {
        let info = layout_of(&format!(
            "{}{}",
            ph(2, "ctrTitle", "Welcome"),
            ph(3, "subTitle", "Onboarding 2024")
        ));
        assert_eq!(info.layout.kind, LayoutKind::TitleSlide);
        assert_eq!(info.title.as_deref(), Some("Welcome"));
        let kinds: Vec<_> = info.elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Title, ElementKind::Subtitle]);
    }

    #[test]
    fn test_title_only() {
        let info = layout_of(&ph(2, "title", "Section Break"));
        assert_eq!(info.layout.kind, LayoutKind::TitleOnly);
    }

    #[test]
    fn test_title_and_content() {
        let info = layout_of(&format!("{}{}", ph(2, "title", "Agenda"), ph(3, "", "Intro")));
        assert_eq!(info.layout.kind, LayoutKind::TitleAndContent);
        assert_eq!(info.layout.name, "Title and Content");
        let body = &info.elements[1];
        assert_eq!(body.kind, ElementKind::Body);
        assert_eq!(body.position, Some((10.0, 20.0)));
        assert_eq!(body.size, Some((100.0, 50.0)));
    }

    #[test]
    fn test_two_content_counts_pictures() {
        let info = layout_of(&format!("{}{}{}", ph(2, "title", "Compare"), ph(3, "", "Left"), PICTURE));
        assert_eq!(info.layout.kind, LayoutKind::TwoContent);
        assert_eq!(info.elements[2].kind, ElementKind::Picture);
        assert!(info.elements[2].position.is_none());
    }

    #[test]
    fn test_content_only() {
        let info = layout_of(PICTURE);
        assert_eq!(info.layout.kind, LayoutKind::ContentOnly);
    }

    #[test]
    fn test_chrome_placeholders_ignored() {
        let info = layout_of(&format!("{}{}", ph(2, "title", "Only"), ph(4, "ftr", "Confidential")));
        assert_eq!(info.layout.kind, LayoutKind::TitleOnly);
        assert_eq!(info.elements.len(), 1);
    }

    #[test]
    fn test_name_from_layout_part() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/>
</Relationships>"#;
        let layout = r#"<p:sldLayout xmlns:p="p" type="obj" preserve="1"><p:cSld name="Title and Bullets"><p:spTree/></p:cSld></p:sldLayout>"#;
        let archive = deck(
            &[&slide_xml(&ph(2, "title", "Agenda"))],
            &[
                ("ppt/slides/_rels/slide1.xml.rels", rels.as_bytes()),
                ("ppt/slideLayouts/slideLayout2.xml", layout.as_bytes()),
            ],
        );
        let info = detect_layout(&archive, 1).unwrap();
        assert_eq!(info.layout.name, "Title and Bullets");
        // Classification still comes from the slide's own shapes.
        assert_eq!(info.layout.kind, LayoutKind::TitleOnly);
    }

    #[test]
    fn test_declared_transition_surfaced() {
        let xml = r#"<p:sld xmlns:p="p"><p:cSld><p:spTree/></p:cSld><p:transition spd="fast"><p:wipe/></p:transition></p:sld>"#;
        let archive = deck(&[xml], &[]);
        let info = detect_layout(&archive, 1).unwrap();
        assert_eq!(
            info.declared_transition,
            Some(Transition::new(TransitionKind::Wipe, 0.5))
        );
    }

    #[test]
    fn test_slide_out_of_range_matches_text_parser() {
        let archive = deck(&[&slide_xml("")], &[]);
        let layout_err = detect_layout(&archive, 2).unwrap_err();
        let text_err = crate::parser::text::extract_text(&archive, 2).unwrap_err();
        assert_eq!(layout_err, text_err);
        assert_eq!(layout_err.kind(), crate::error::ErrorKind::SlideOutOfRange);
    }
}
