use crate::error::PatchError;
use crate::patches::{Patch, PatchOutcome, reference_paths};
use projfix_lookup::{HINT_PATH, is_same_reference};
use projfix_xml::{Document, Element};
use tracing::debug;

pub const UNIT_TEST_FRAMEWORK: &str = "Microsoft.VisualStudio.QualityTools.UnitTestFramework";

pub const UNIT_TEST_HINT_PATH: &str = r"$(PkgVisualStudio_UnitTest_Corext)\lib\net40\Microsoft.VisualStudio.QualityTools.UnitTestFramework.dll";

/// Point the Visual Studio unit-test framework reference at its package, adding the
/// `HintPath` if the reference has none. Any version of the reference matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixUnitTestHintPath;

impl Patch for FixUnitTestHintPath {
    fn id(&self) -> &'static str {
        "unittest"
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError> {
        let mut outcome = PatchOutcome::default();
        let mut found = false;

        for path in reference_paths(doc) {
            let Some(reference) = doc.element_mut(&path) else {
                continue;
            };
            let include = reference.attr("Include").unwrap_or_default();
            if !is_same_reference(include, UNIT_TEST_FRAMEWORK) {
                continue;
            }
            found = true;

            match reference.child_mut(HINT_PATH) {
                Some(hint) if hint.text().as_deref() == Some(UNIT_TEST_HINT_PATH) => {}
                Some(hint) => {
                    hint.set_text(UNIT_TEST_HINT_PATH);
                    debug!("updated unit-test framework hint path");
                    outcome.edits += 1;
                }
                None => {
                    let mut hint = Element::new(HINT_PATH).with_text(UNIT_TEST_HINT_PATH);
                    if let Some(prefix) = reference.prefix() {
                        hint.adopt_prefix(prefix);
                    }
                    reference.append_child(hint);
                    debug!("added unit-test framework hint path");
                    outcome.edits += 1;
                }
            }
        }

        if !found {
            debug!("no unit-test framework reference");
            outcome.skip(format!("no {UNIT_TEST_FRAMEWORK} reference"));
        }
        Ok(outcome)
    }
}
