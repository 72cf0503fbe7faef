use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;

use super::presentation::parse_slide_size;
use super::push_reference;
use crate::ir::ProjectMetadata;
use crate::package::{PRESENTATION, PackageArchive};

const CORE_PROPS: &str = "docProps/core.xml";
const APP_PROPS: &str = "docProps/app.xml";

/// Dublin Core properties from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Extended properties from `docProps/app.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppProperties {
    pub application: Option<String>,
    /// The producer's own slide count. Informational only; the slide id list
    /// in the presentation descriptor is authoritative.
    pub slides: Option<u32>,
}

/// Build the project metadata for an opened package.
///
/// Missing or unparseable property parts yield empty strings and `None`
/// timestamps, never an error. `slide_count` always comes from the
/// presentation's slide id list.
pub fn extract_metadata(archive: &PackageArchive, file_size: u64) -> ProjectMetadata {
    let core = archive
        .entry_text(CORE_PROPS)
        .map(|xml| parse_core_xml(&xml))
        .unwrap_or_default();
    let app = archive
        .entry_text(APP_PROPS)
        .map(|xml| parse_app_xml(&xml))
        .unwrap_or_default();
    let slide_size = archive
        .entry_text(PRESENTATION)
        .and_then(|xml| parse_slide_size(&xml));

    let slide_count = archive.slide_count();
    if let Some(declared) = app.slides
        && declared != slide_count
    {
        tracing::debug!(
            declared,
            slide_count,
            "app.xml slide count disagrees with slide id list"
        );
    }

    ProjectMetadata {
        title: core.title.unwrap_or_default(),
        author: core.author.unwrap_or_default(),
        subject: core.subject.unwrap_or_default(),
        created_at: core.created.as_deref().and_then(parse_w3cdtf),
        modified_at: core.modified.as_deref().and_then(parse_w3cdtf),
        application: app.application.unwrap_or_default(),
        slide_count,
        file_size,
        slide_size,
    }
}

/// Parse a W3CDTF timestamp (`2024-01-15T10:30:00Z`, optionally with
/// fractional seconds or an offset).
pub fn parse_w3cdtf(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse Dublin Core metadata from `docProps/core.xml` content string.
///
/// Extracts: `dc:title`, `dc:creator`, `dc:subject`, `dcterms:created`,
/// `dcterms:modified`.
pub fn parse_core_xml(xml: &str) -> CoreProperties {
    let mut props = CoreProperties::default();
    let mut reader = Reader::from_str(xml);

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Field {
        None,
        Title,
        Creator,
        Subject,
        Created,
        Modified,
    }

    let mut current = Field::None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = match e.local_name().as_ref() {
                    b"title" => Field::Title,
                    b"creator" => Field::Creator,
                    b"subject" => Field::Subject,
                    b"created" => Field::Created,
                    b"modified" => Field::Modified,
                    _ => Field::None,
                };
                text.clear();
            }
            Ok(Event::Text(e)) if current != Field::None => {
                if let Ok(t) = e.xml_content() {
                    text.push_str(&t);
                }
            }
            Ok(Event::GeneralRef(r)) if current != Field::None => push_reference(&mut text, &r),
            Ok(Event::End(_)) => {
                let value = text.trim();
                if current != Field::None && !value.is_empty() {
                    let value = Some(value.to_string());
                    match current {
                        Field::Title => props.title = value,
                        Field::Creator => props.author = value,
                        Field::Subject => props.subject = value,
                        Field::Created => props.created = value,
                        Field::Modified => props.modified = value,
                        Field::None => {}
                    }
                }
                current = Field::None;
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    props
}

/// Parse `<Application>` and `<Slides>` from `docProps/app.xml`.
pub fn parse_app_xml(xml: &str) -> AppProperties {
    let mut props = AppProperties::default();
    let mut reader = Reader::from_str(xml);

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Field {
        None,
        Application,
        Slides,
    }

    let mut current = Field::None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = match e.local_name().as_ref() {
                    b"Application" => Field::Application,
                    b"Slides" => Field::Slides,
                    _ => Field::None,
                };
                text.clear();
            }
            Ok(Event::Text(e)) if current != Field::None => {
                if let Ok(t) = e.xml_content() {
                    text.push_str(&t);
                }
            }
            Ok(Event::GeneralRef(r)) if current != Field::None => push_reference(&mut text, &r),
            Ok(Event::End(_)) => {
                let value = text.trim();
                match current {
                    Field::Application if !value.is_empty() => {
                        props.application = Some(value.to_string());
                    }
                    Field::Slides => props.slides = value.parse().ok(),
                    _ => {}
                }
                current = Field::None;
                text.clear();
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    props
}
