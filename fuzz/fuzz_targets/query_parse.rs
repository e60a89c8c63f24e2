#![no_main]

//! Fuzz target for element query parsing.

use libfuzzer_sys::fuzz_target;
use projfix_xml::{Document, Query};

const PROJECT: &str = r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup><OutputType>Library</OutputType></PropertyGroup>
  <ItemGroup><Reference Include="A"><HintPath>a.dll</HintPath></Reference></ItemGroup>
</Project>"#;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(query) = s.parse::<Query>() else {
        return;
    };

    // A parsed query displays as text that parses to the same query.
    let again: Query = query.to_string().parse().expect("displayed query must parse");
    assert_eq!(again, query);

    let doc = Document::parse(PROJECT).expect("fixture parses");
    for path in doc.select_paths(&query) {
        assert!(doc.element(&path).is_some());
    }
});
