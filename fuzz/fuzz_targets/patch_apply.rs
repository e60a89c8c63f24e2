#![no_main]

//! Fuzz target for patch idempotence on arbitrary project text.

use libfuzzer_sys::fuzz_target;
use projfix_domain::{
    AddPropertyIfAbsent, AddTestProperties, ApplyLookup, FixUnitTestHintPath, Patch,
    SetFrameworkVersion, StripVersion,
};
use projfix_lookup::LookupStore;
use projfix_xml::Document;

#[derive(Debug, arbitrary::Arbitrary)]
struct PatchInput {
    xml: String,
    which: PatchKind,
    lookup: Vec<(String, String)>,
    exclude_external: bool,
}

#[derive(Debug, arbitrary::Arbitrary)]
enum PatchKind {
    Cls,
    UnitTest,
    FrameworkVersion,
    QTest,
    Versionless,
    Pathfix,
}

fuzz_target!(|input: PatchInput| {
    let patch: Box<dyn Patch> = match input.which {
        PatchKind::Cls => Box::new(AddPropertyIfAbsent::cls_compliant()),
        PatchKind::UnitTest => Box::new(FixUnitTestHintPath),
        PatchKind::FrameworkVersion => {
            Box::new(SetFrameworkVersion::new("v4.5.2".parse().expect("valid version")))
        }
        PatchKind::QTest => Box::new(AddTestProperties),
        PatchKind::Versionless => Box::new(StripVersion::new(input.exclude_external)),
        PatchKind::Pathfix => {
            let store: LookupStore = input.lookup.into_iter().collect();
            Box::new(ApplyLookup::new(store))
        }
    };

    let Ok(mut doc) = Document::parse(&input.xml) else {
        return;
    };
    if patch.apply(&mut doc).is_err() {
        return;
    }
    let once = doc.to_xml_string();
    let second = patch.apply(&mut doc).expect("second application succeeds");
    assert!(!second.changed(), "{} is not idempotent", patch.id());
    assert_eq!(doc.to_xml_string(), once);
});
