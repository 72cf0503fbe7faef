use super::shapes::{PlaceholderRole, ShapeInfo, scan_slide};
use crate::error::IngestError;
use crate::ir::TextBox;
use crate::package::PackageArchive;

/// Glyphs that mark a list item when typed at the start of a paragraph
/// instead of declared through bullet properties.
const BULLET_GLYPHS: &[char] = &[
    '\u{2022}', '\u{25E6}', '\u{25AA}', '\u{25CF}', '\u{25CB}', '\u{25A0}', '\u{2023}', '\u{00B7}',
    '\u{2013}', '-', '*',
];

/// Text extracted from one slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideText {
    /// All paragraphs, one per line. Title placeholders come first, each
    /// collapsed onto a single line.
    pub plain_text: String,
    pub bullet_points: Vec<String>,
    pub text_boxes: Vec<TextBox>,
    /// Whitespace-delimited words in `plain_text`.
    pub word_count: usize,
    /// Unicode scalar values in `plain_text`.
    pub character_count: usize,
}

/// Extract text, bullets and text boxes from slide `slide_number` (1-based).
pub fn extract_text(archive: &PackageArchive, slide_number: u32) -> Result<SlideText, IngestError> {
    let part = archive.slide_part(slide_number)?;
    let xml = archive.entry_text(part).unwrap_or_default();
    let scanned = scan_slide(&xml).map_err(|e| IngestError::xml(part, e))?;
    Ok(collect_text(slide_number, &scanned.shapes))
}

/// Speaker notes of slide `slide_number`, or an empty string when the slide
/// has no notes part.
pub fn extract_notes(archive: &PackageArchive, slide_number: u32) -> Result<String, IngestError> {
    let part = archive.slide_part(slide_number)?;
    let Some(notes_part) = archive
        .relationships(part)?
        .into_iter()
        .find(|r| r.is_type("notesSlide") && !r.external)
        .map(|r| r.target)
    else {
        return Ok(String::new());
    };
    let Some(xml) = archive.entry_text(&notes_part) else {
        return Ok(String::new());
    };
    let scanned = scan_slide(&xml).map_err(|e| IngestError::xml(&notes_part, e))?;

    // Notes pages also carry the slide image and header/footer placeholders.
    let notes = scanned
        .shapes
        .iter()
        .filter(|s| {
            matches!(
                s.placeholder,
                None | Some(PlaceholderRole::Body) | Some(PlaceholderRole::Object)
            )
        })
        .map(ShapeInfo::text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(notes)
}

fn collect_text(slide_number: u32, shapes: &[ShapeInfo]) -> SlideText {
    let mut ordered: Vec<&ShapeInfo> = shapes
        .iter()
        .filter(|s| s.has_text() && !s.placeholder.is_some_and(|r| r.is_chrome()))
        .collect();
    ordered.sort_by_key(|s| !s.placeholder.is_some_and(|r| r.is_title()));

    let mut lines = Vec::new();
    let mut bullet_points = Vec::new();
    let mut text_boxes = Vec::new();

    for (index, shape) in ordered.iter().enumerate() {
        if shape.placeholder.is_some_and(|r| r.is_title()) {
            // A title wrapped over several paragraphs is still one line.
            lines.push(
                shape
                    .paragraphs
                    .iter()
                    .map(|p| p.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        } else {
            for para in &shape.paragraphs {
                let text = para.text.trim();
                if text.is_empty() {
                    continue;
                }
                lines.push(text.to_string());

                if let Some(stripped) = strip_bullet_glyph(text) {
                    bullet_points.push(stripped.to_string());
                } else if shape.is_bullet(para) {
                    bullet_points.push(text.to_string());
                }
            }
        }

        let shape_id = shape.id.unwrap_or(index as u32 + 1);
        text_boxes.push(TextBox {
            id: format!("slide-{slide_number}-shape-{shape_id}"),
            text: shape.text(),
            position: shape.geometry,
        });
    }

    let plain_text = lines.join("\n");
    SlideText {
        word_count: plain_text.split_whitespace().count(),
        character_count: plain_text.chars().count(),
        plain_text,
        bullet_points,
        text_boxes,
    }
}

/// `"• Item"` -> `Some("Item")`. The glyph must be followed by whitespace so
/// that hyphenated words and negative numbers are left alone.
fn strip_bullet_glyph(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if !BULLET_GLYPHS.contains(&first) {
        return None;
    }
    let rest = chars.as_str();
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    (!rest.is_empty()).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures::deck;

    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    fn slide_xml(shapes: &str) -> String {
        format!(r#"<p:sld {NS}><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#)
    }

    fn sp(id: u32, ph: &str, xfrm: &str, paras: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr>{xfrm}</p:spPr><p:txBody><a:bodyPr/>{paras}</p:txBody></p:sp>"#
        )
    }

    fn para(text: &str) -> String {
        format!("<a:p><a:r><a:t>{text}</a:t></a:r></a:p>")
    }

    #[test]
    fn test_title_and_body_bullets() {
        let xml = slide_xml(&format!(
            "{}{}",
            sp(2, r#"<p:ph type="title"/>"#, "", &para("Safety Basics")),
            sp(
                3,
                r#"<p:ph idx="1"/>"#,
                r#"<a:xfrm><a:off x="0" y="1270000"/><a:ext cx="12700000" cy="2540000"/></a:xfrm>"#,
                &format!("{}{}", para("Wear gloves"), para("Check guards")),
            ),
        ));
        let archive = deck(&[&xml], &[]);
        let text = extract_text(&archive, 1).unwrap();

        assert_eq!(text.plain_text, "Safety Basics\nWear gloves\nCheck guards");
        assert_eq!(text.bullet_points, vec!["Wear gloves", "Check guards"]);
        assert_eq!(text.word_count, 6);
        assert_eq!(text.character_count, text.plain_text.chars().count());

        assert_eq!(text.text_boxes.len(), 2);
        assert_eq!(text.text_boxes[0].id, "slide-1-shape-2");
        assert!(text.text_boxes[0].position.is_none());
        let body = text.text_boxes[1].position.unwrap();
        assert_eq!(body.y, 100.0);
        assert_eq!(body.width, 1000.0);
    }

    #[test]
    fn test_title_placeholder_leads_plain_text() {
        let xml = slide_xml(&format!(
            "{}{}",
            sp(5, "", "", &para("Footnote first in z-order")),
            sp(2, r#"<p:ph type="ctrTitle"/>"#, "", &para("Real Title")),
        ));
        let archive = deck(&[&xml], &[]);
        let text = extract_text(&archive, 1).unwrap();
        assert!(text.plain_text.starts_with("Real Title\n"));
        assert!(text.bullet_points.is_empty());
    }

    #[test]
    fn test_wrapped_title_joins_into_one_line() {
        let xml = slide_xml(&format!(
            "{}{}",
            sp(
                2,
                r#"<p:ph type="title"/>"#,
                "",
                &format!("{}<a:p/>{}", para("Quarterly Safety"), para("Review 2024")),
            ),
            sp(3, r#"<p:ph idx="1"/>"#, "", &para("Incidents down")),
        ));
        let archive = deck(&[&xml], &[]);
        let text = extract_text(&archive, 1).unwrap();
        assert_eq!(text.plain_text, "Quarterly Safety Review 2024\nIncidents down");
        assert_eq!(text.bullet_points, vec!["Incidents down"]);
        assert_eq!(text.text_boxes[0].text, "Quarterly Safety\nReview 2024");
    }

    #[test]
    fn test_glyph_prefixed_lines_are_bullets() {
        let xml = slide_xml(&sp(
            4,
            "",
            "",
            &format!(
                "{}{}{}",
                para("\u{2022} Inspect daily"),
                para("- Report faults"),
                para("-5 degrees is not a bullet"),
            ),
        ));
        let archive = deck(&[&xml], &[]);
        let text = extract_text(&archive, 1).unwrap();
        assert_eq!(text.bullet_points, vec!["Inspect daily", "Report faults"]);
        assert!(text.plain_text.contains("\u{2022} Inspect daily"));
    }

    #[test]
    fn test_footer_and_slide_number_skipped() {
        let xml = slide_xml(&format!(
            "{}{}",
            sp(2, r#"<p:ph type="title"/>"#, "", &para("Agenda")),
            sp(7, r#"<p:ph type="sldNum" idx="12"/>"#, "", &para("3")),
        ));
        let archive = deck(&[&xml], &[]);
        let text = extract_text(&archive, 1).unwrap();
        assert_eq!(text.plain_text, "Agenda");
        assert_eq!(text.text_boxes.len(), 1);
    }

    #[test]
    fn test_shapes_without_text_have_no_text_box() {
        let xml = slide_xml(&sp(3, "", "", "<a:p/>"));
        let archive = deck(&[&xml], &[]);
        let text = extract_text(&archive, 1).unwrap();
        assert_eq!(text, SlideText::default());
    }

    #[test]
    fn test_slide_out_of_range() {
        let archive = deck(&[&slide_xml("")], &[]);
        let err = extract_text(&archive, 2).unwrap_err();
        assert_eq!(
            err,
            IngestError::SlideNotFound {
                slide_number: 2,
                slide_count: 1
            }
        );
    }

    #[test]
    fn test_malformed_slide_is_xml_error() {
        let archive = deck(&["<p:sld><p:cSld></p:sld>"], &[]);
        let err = extract_text(&archive, 1).unwrap_err();
        assert!(matches!(err, IngestError::Xml { ref part, .. } if part == "ppt/slides/slide1.xml"));
    }

    #[test]
    fn test_extract_notes() {
        let slide_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide1.xml"/>
</Relationships>"#;
        let notes = format!(
            r#"<p:notes {NS}><p:cSld><p:spTree>{}{}{}</p:spTree></p:cSld></p:notes>"#,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image 1"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
            sp(3, r#"<p:ph type="body" idx="1"/>"#, "", &para("Pause for questions.")),
            sp(4, r#"<p:ph type="sldNum" idx="5"/>"#, "", &para("1")),
        );
        let archive = deck(
            &[&slide_xml(""), &slide_xml("")],
            &[
                ("ppt/slides/_rels/slide1.xml.rels", slide_rels.as_bytes()),
                ("ppt/notesSlides/notesSlide1.xml", notes.as_bytes()),
            ],
        );
        assert_eq!(extract_notes(&archive, 1).unwrap(), "Pause for questions.");
        assert_eq!(extract_notes(&archive, 2).unwrap(), "");
    }

    #[test]
    fn test_strip_bullet_glyph() {
        assert_eq!(strip_bullet_glyph("* starred"), Some("starred"));
        assert_eq!(strip_bullet_glyph("\u{2013}  en dash"), Some("en dash"));
        assert_eq!(strip_bullet_glyph("well-known"), None);
        assert_eq!(strip_bullet_glyph("- "), None);
        assert_eq!(strip_bullet_glyph(""), None);
    }
}
