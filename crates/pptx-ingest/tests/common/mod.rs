//! Shared test utilities for integration tests.
//!
//! Decks are generated in memory with [`PptxBuilder`] so every test states
//! exactly what the package contains.

#![allow(dead_code)]

use std::io::{Cursor, Write};

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// One slide of a generated deck.
#[derive(Debug, Clone, Default)]
pub struct SlideSpec {
    pub title: Option<String>,
    pub bullets: Vec<String>,
    /// `(file name, bytes)` pairs stored under `ppt/media/`.
    pub images: Vec<(String, Vec<u8>)>,
    pub notes: Option<String>,
    /// Effect element name, e.g. `"push"`.
    pub transition: Option<String>,
}

impl SlideSpec {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn bullets(mut self, bullets: &[&str]) -> Self {
        self.bullets = bullets.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn image(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.images.push((name.to_string(), bytes));
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn transition(mut self, effect: &str) -> Self {
        self.transition = Some(effect.to_string());
        self
    }
}

/// Writes minimal but well-formed PPTX packages.
#[derive(Debug, Clone, Default)]
pub struct PptxBuilder {
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
    pub slides: Vec<SlideSpec>,
}

impl PptxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn created(mut self, created: &str) -> Self {
        self.created = Some(created.to_string());
        self
    }

    pub fn slide(mut self, slide: SlideSpec) -> Self {
        self.slides.push(slide);
        self
    }

    /// `count` slides titled `Slide title 1..=count`, each with two bullets.
    pub fn numbered_slides(mut self, count: usize) -> Self {
        for i in 1..=count {
            self.slides.push(
                SlideSpec::titled(&format!("Slide title {i}"))
                    .bullets(&[&format!("Point {i}.1"), &format!("Point {i}.2")]),
            );
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        let mut push = |name: String, content: String| entries.push((name, content.into_bytes()));

        push("[Content_Types].xml".into(), content_types());
        push(
            "_rels/.rels".into(),
            rels(&[
                ("rId1", "officeDocument", "ppt/presentation.xml"),
                ("rId2", "metadata/core-properties", "docProps/core.xml"),
                ("rId3", "extended-properties", "docProps/app.xml"),
            ]),
        );
        push("docProps/core.xml".into(), self.core_xml());
        push(
            "docProps/app.xml".into(),
            format!(
                r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Microsoft Office PowerPoint</Application><Slides>{}</Slides></Properties>"#,
                self.slides.len()
            ),
        );

        let ids: String = (1..=self.slides.len())
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 1))
            .collect();
        push(
            "ppt/presentation.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
            ),
        );
        let slide_rels: Vec<(String, &str, String)> = (1..=self.slides.len())
            .map(|i| (format!("rId{}", i + 1), "slide", format!("slides/slide{i}.xml")))
            .collect();
        push(
            "ppt/_rels/presentation.xml.rels".into(),
            rels(
                &slide_rels
                    .iter()
                    .map(|(id, ty, target)| (id.as_str(), *ty, target.as_str()))
                    .collect::<Vec<_>>(),
            ),
        );

        let mut media: Vec<(String, Vec<u8>)> = Vec::new();
        for (index, spec) in self.slides.iter().enumerate() {
            let n = index + 1;
            let mut rel_list = vec![(
                "rId1".to_string(),
                "slideLayout",
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            for (k, (name, bytes)) in spec.images.iter().enumerate() {
                rel_list.push((format!("rId{}", k + 10), "image", format!("../media/{name}")));
                let part = format!("ppt/media/{name}");
                if !media.iter().any(|(existing, _)| *existing == part) {
                    media.push((part, bytes.clone()));
                }
            }
            if let Some(notes) = &spec.notes {
                rel_list.push((
                    "rId2".to_string(),
                    "notesSlide",
                    format!("../notesSlides/notesSlide{n}.xml"),
                ));
                push(format!("ppt/notesSlides/notesSlide{n}.xml"), notes_xml(notes));
            }
            push(format!("ppt/slides/slide{n}.xml"), slide_xml(spec));
            push(
                format!("ppt/slides/_rels/slide{n}.xml.rels"),
                rels(
                    &rel_list
                        .iter()
                        .map(|(id, ty, target)| (id.as_str(), *ty, target.as_str()))
                        .collect::<Vec<_>>(),
                ),
            );
        }
        push(
            "ppt/slideLayouts/slideLayout1.xml".into(),
            format!(r#"<p:sldLayout {NS} type="obj"><p:cSld name="Title and Content"><p:spTree/></p:cSld></p:sldLayout>"#),
        );

        entries.extend(media);
        zip_entries(&entries)
    }

    fn core_xml(&self) -> String {
        let mut body = String::new();
        if let Some(title) = &self.title {
            body.push_str(&format!("<dc:title>{}</dc:title>", escape(title)));
        }
        if let Some(author) = &self.author {
            body.push_str(&format!("<dc:creator>{}</dc:creator>", escape(author)));
        }
        if let Some(created) = &self.created {
            body.push_str(&format!(
                r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{body}</cp:coreProperties>"#
        )
    }
}

fn slide_xml(spec: &SlideSpec) -> String {
    let mut tree = String::new();
    if let Some(title) = &spec.title {
        tree.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="838200" y="365125"/><a:ext cx="10515600" cy="1325563"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="pt-BR"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            escape(title)
        ));
    }
    if !spec.bullets.is_empty() {
        let paras: String = spec
            .bullets
            .iter()
            .map(|b| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", escape(b)))
            .collect();
        tree.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/>{paras}</p:txBody></p:sp>"#
        ));
    }
    for k in 0..spec.images.len() {
        tree.push_str(&format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Picture {k}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId{}"/></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="1270000" cy="1270000"/></a:xfrm></p:spPr></p:pic>"#,
            k + 10,
            k + 10
        ));
    }
    let transition = spec
        .transition
        .as_ref()
        .map(|t| format!(r#"<p:transition spd="med"><p:{t}/></p:transition>"#))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{tree}</p:spTree></p:cSld>{transition}</p:sld>"#
    )
}

fn notes_xml(notes: &str) -> String {
    format!(
        r#"<p:notes {NS}><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:notes>"#,
        escape(notes)
    )
}

fn content_types() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/></Types>"#.to_string()
}

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, ty, target)| {
            let ty = if ty.contains('/') {
                format!("http://schemas.openxmlformats.org/package/2006/relationships/{ty}")
            } else {
                format!("{REL_NS}/{ty}")
            };
            format!(r#"<Relationship Id="{id}" Type="{ty}" Target="{target}"/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Write `entries` into an in-memory ZIP archive.
pub fn zip_entries(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, content) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A small solid-color PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// The five-slide deck used by the end-to-end scenarios.
pub fn five_slide_deck() -> Vec<u8> {
    PptxBuilder::new()
        .title("Apresentação de Teste - PPTX Processing")
        .author("Sistema de Teste")
        .created("2024-06-15T10:30:00Z")
        .numbered_slides(5)
        .build()
}
