//! Read-only, in-memory view of a presentation package.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::config::{MAX_ARCHIVE_ENTRIES, MAX_UNCOMPRESSED_SIZE};
use crate::error::{ArchiveError, IngestError};
use crate::parser::presentation;

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const ROOT_RELS: &str = "_rels/.rels";
pub const PRESENTATION: &str = "ppt/presentation.xml";

const REQUIRED_ENTRIES: [&str; 3] = [CONTENT_TYPES, ROOT_RELS, PRESENTATION];

/// Upper bound on the buffer reserved from an entry's declared size.
const PREALLOC_LIMIT: u64 = 64 * 1024;

/// Every entry of an opened package, keyed by part name (no leading `/`).
///
/// Never mutated after [`PackageArchive::open`] returns, so one instance can
/// be shared by concurrent parsers.
#[derive(Debug)]
pub struct PackageArchive {
    entries: BTreeMap<String, Vec<u8>>,
    /// Slide part names in presentation order.
    slide_parts: Vec<String>,
}

/// A single `<Relationship>` from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Resolved part name for internal targets; the raw target otherwise.
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// True when the relationship type ends with `/<suffix>`.
    pub fn is_type(&self, suffix: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|t| t == suffix)
    }
}

impl PackageArchive {
    /// Decode `data` as a ZIP archive and check that it is a presentation
    /// package. Any failure here is fatal for the whole invocation.
    pub fn open(data: &[u8]) -> Result<Self, IngestError> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

        if archive.len() > MAX_ARCHIVE_ENTRIES {
            return Err(ArchiveError::TooManyEntries(MAX_ARCHIVE_ENTRIES).into());
        }

        let mut entries = BTreeMap::new();
        let mut total: u64 = 0;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();

            // The declared size can lie in either direction: only reserve a
            // bounded buffer up front and cap the actual read.
            let budget = MAX_UNCOMPRESSED_SIZE - total;
            if file.size() > budget {
                return Err(ArchiveError::TooLargeUncompressed(MAX_UNCOMPRESSED_SIZE).into());
            }
            let mut buf = Vec::with_capacity(file.size().min(PREALLOC_LIMIT) as usize);
            file.take(budget + 1)
                .read_to_end(&mut buf)
                .map_err(|e| ArchiveError::Corrupt(format!("{name}: {e}")))?;
            total += buf.len() as u64;
            if total > MAX_UNCOMPRESSED_SIZE {
                return Err(ArchiveError::TooLargeUncompressed(MAX_UNCOMPRESSED_SIZE).into());
            }
            buf.shrink_to_fit();
            entries.insert(name, buf);
        }

        for required in REQUIRED_ENTRIES {
            if !entries.contains_key(required) {
                return Err(ArchiveError::MissingEntry(required).into());
            }
        }

        let mut package = Self {
            entries,
            slide_parts: Vec::new(),
        };
        package.slide_parts = package.resolve_slide_parts()?;
        tracing::debug!(
            entries = package.entries.len(),
            uncompressed = total,
            slides = package.slide_parts.len(),
            "opened presentation package"
        );
        Ok(package)
    }

    fn resolve_slide_parts(&self) -> Result<Vec<String>, IngestError> {
        let xml = self.entry_text(PRESENTATION).unwrap_or_default();
        let rel_ids = presentation::parse_slide_id_list(&xml)
            .map_err(|e| IngestError::from(ArchiveError::Corrupt(format!("{PRESENTATION}: {e}"))))?;
        let rels = self.relationships(PRESENTATION)?;

        Ok(rel_ids
            .iter()
            .enumerate()
            .map(|(i, rid)| {
                rels.iter()
                    .find(|r| &r.id == rid && !r.external)
                    .map(|r| r.target.clone())
                    .unwrap_or_else(|| format!("ppt/slides/slide{}.xml", i + 1))
            })
            .collect())
    }

    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Entry contents as text, replacing invalid UTF-8.
    pub fn entry_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.entry(name).map(String::from_utf8_lossy)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of slides listed by the presentation descriptor.
    pub fn slide_count(&self) -> u32 {
        self.slide_parts.len() as u32
    }

    /// Part name of the 1-based `slide_number`.
    ///
    /// Fails with [`IngestError::SlideNotFound`] when the number is outside
    /// `1..=slide_count` or the listed part is absent from the archive.
    pub fn slide_part(&self, slide_number: u32) -> Result<&str, IngestError> {
        let not_found = || IngestError::SlideNotFound {
            slide_number,
            slide_count: self.slide_count(),
        };
        let index = slide_number.checked_sub(1).ok_or_else(not_found)? as usize;
        let part = self.slide_parts.get(index).ok_or_else(not_found)?;
        if !self.contains(part) {
            return Err(not_found());
        }
        Ok(part)
    }

    /// Parse the relationship index belonging to `part`. A part without a
    /// `.rels` entry simply has no relationships.
    pub fn relationships(&self, part: &str) -> Result<Vec<Relationship>, IngestError> {
        let rels_name = rels_path_for(part);
        match self.entry_text(&rels_name) {
            Some(xml) => parse_relationships(&xml, part).map_err(|e| IngestError::xml(&rels_name, e)),
            None => Ok(Vec::new()),
        }
    }
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns the `.rels`.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return normalize(abs.split('/').collect());
    }
    let mut segments: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    segments.extend(target.split('/'));
    normalize(segments)
}

fn normalize(segments: Vec<&str>) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());
    for seg in segments {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

fn parse_relationships(xml: &str, source_part: &str) -> Result<Vec<Relationship>, quick_xml::Error> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut external = false;
                for attr in e.attributes().flatten() {
                    let Ok(value) = attr.unescape_value() else {
                        continue;
                    };
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = value.into_owned(),
                        b"Type" => rel_type = value.into_owned(),
                        b"Target" => target = value.into_owned(),
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }
                if !external {
                    target = resolve_target(source_part, &target);
                }
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}
