use crate::error::PatchError;
use crate::patches::{Patch, PatchOutcome};
use projfix_lookup::TEST_PROJECT_PATTERN;
use projfix_xml::{Document, Query};
use tracing::debug;

/// Add the QTest runner properties to the first property group of a test project.
///
/// A test project without any property group is a structure error for that file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddTestProperties;

impl AddTestProperties {
    const MARKER: &'static str = "QTestType";
    const PROPERTIES: [&'static str; 2] = [
        "<QTestType>MsTest_Latest</QTestType>",
        "<QTestDirToDeploy>$(OutDir)</QTestDirToDeploy>",
    ];
}

impl Patch for AddTestProperties {
    fn id(&self) -> &'static str {
        "qtest"
    }

    fn file_pattern(&self) -> &str {
        TEST_PROJECT_PATTERN
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError> {
        if doc.contains(&Query::descendant(Self::MARKER)) {
            debug!("QTest properties already present");
            return Ok(PatchOutcome::default());
        }

        let group = Query::descendant("PropertyGroup");
        for fragment in Self::PROPERTIES {
            doc.insert_fragment_as_child(&group, fragment)?;
        }
        Ok(PatchOutcome::edited(Self::PROPERTIES.len()))
    }
}
