use projfix_xml::{Document, Element, Query};
use std::collections::BTreeMap;

/// Local name of a dependency declaration.
pub const REFERENCE: &str = "Reference";

/// Local name of the path hint nested in a reference.
pub const HINT_PATH: &str = "HintPath";

/// The significant part of a reference name: its first comma-separated token, trimmed.
///
/// `"Foo, Version=1.0, Culture=neutral"` has identity `"Foo"`.
pub fn identity(name: &str) -> &str {
    name.split(',').next().unwrap_or_default().trim()
}

/// Two reference names denote the same dependency when their identities match, whatever
/// their version, culture or key metadata.
pub fn is_same_reference(a: &str, b: &str) -> bool {
    identity(a) == identity(b)
}

/// Map each reference that carries a `HintPath` child to that hint path.
///
/// Keys are the full `Include` strings, not identities. References without a hint path are
/// skipped; an empty hint path maps to `""`.
pub fn extract_hint_paths(doc: &Document) -> BTreeMap<String, String> {
    let query = Query::descendant(REFERENCE).with_attr("Include");
    doc.find_all(&query)
        .filter_map(|reference| {
            let include = reference.attr("Include")?;
            let hint = hint_path_of(reference)?;
            Some((include.to_string(), hint))
        })
        .collect()
}

/// Hint-path text of a reference element, if it has one.
pub fn hint_path_of(reference: &Element) -> Option<String> {
    reference.child(HINT_PATH).map(|h| h.text().unwrap_or_default())
}
