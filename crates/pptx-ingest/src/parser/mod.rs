pub mod images;
pub mod layout;
pub mod metadata;
pub(crate) mod presentation;
pub(crate) mod shapes;
pub mod text;

use quick_xml::events::BytesRef;
use quick_xml::events::attributes::Attributes;

/// Append the text an entity or character reference stands for.
///
/// quick-xml reports `&amp;`, `&#x2022;` and friends as separate events;
/// unknown entities are dropped.
pub(crate) fn push_reference(out: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        out.push(ch);
    } else if let Ok(name) = reference.decode()
        && let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name)
    {
        out.push_str(resolved);
    }
}

/// Value of the attribute whose local name is `name`, unescaped.
pub(crate) fn attr_value(attrs: Attributes<'_>, name: &[u8]) -> Option<String> {
    attrs.flatten().find_map(|attr| {
        (attr.key.local_name().as_ref() == name)
            .then(|| attr.unescape_value().ok().map(|v| v.into_owned()))
            .flatten()
    })
}

/// Integer attribute (EMU coordinates and the like); unparseable values
/// count as absent.
pub(crate) fn attr_i64(attrs: Attributes<'_>, name: &[u8]) -> Option<i64> {
    attr_value(attrs, name)?.trim().parse().ok()
}
