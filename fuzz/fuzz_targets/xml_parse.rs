#![no_main]

//! Fuzz target for project file parsing and serialization.
//!
//! Anything that parses must serialize to text that parses again and serializes the same.

use libfuzzer_sys::fuzz_target;
use projfix_xml::Document;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = Document::parse(s) else {
        return;
    };

    let first = doc.to_xml_string();
    let reparsed = Document::parse(&first).expect("serialized output must parse");
    assert_eq!(reparsed.to_xml_string(), first);
});
