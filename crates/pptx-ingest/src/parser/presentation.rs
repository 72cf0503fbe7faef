//! Readers for the top-level presentation descriptor (`ppt/presentation.xml`).

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::ir::{SlideSize, emu_to_pt};

/// Relationship ids of `<p:sldIdLst>` entries, in presentation order.
///
/// The list length is the authoritative slide count of the package.
pub(crate) fn parse_slide_id_list(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut in_list = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"sldIdLst" => in_list = true,
            Event::End(e) if e.local_name().as_ref() == b"sldIdLst" => in_list = false,
            Event::Start(e) | Event::Empty(e)
                if in_list && e.local_name().as_ref() == b"sldId" =>
            {
                // `id` is the numeric slide id; the prefixed `r:id` is the relationship.
                let rid = e.attributes().flatten().find_map(|attr| {
                    (attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id")
                        .then(|| attr.unescape_value().ok().map(|v| v.into_owned()))
                        .flatten()
                });
                ids.push(rid.unwrap_or_default());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

/// Slide dimensions from `<p:sldSz cx=".." cy=".."/>`.
pub(crate) fn parse_slide_size(xml: &str) -> Option<SlideSize> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sldSz" => {
                let mut cx = None;
                let mut cy = None;
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().ok().and_then(|v| v.parse::<i64>().ok());
                    match attr.key.local_name().as_ref() {
                        b"cx" => cx = value,
                        b"cy" => cy = value,
                        _ => {}
                    }
                }
                return Some(SlideSize {
                    width: emu_to_pt(cx?),
                    height: emu_to_pt(cy?),
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
