use crate::error::PatchError;
use crate::patches::{Patch, PatchOutcome};
use projfix_xml::{Document, Query};
use tracing::debug;

/// Insert a fragment next to an anchor unless an element named `check` already exists
/// anywhere in the document.
#[derive(Debug, Clone)]
pub struct AddPropertyIfAbsent {
    id: &'static str,
    check: String,
    fragment: String,
    anchor: Query,
}

impl AddPropertyIfAbsent {
    const CLS_ID: &'static str = "cls";
    const CLS_TAG: &'static str = "AssemblyClsCompliant";
    const CLS_FRAGMENT: &'static str =
        "<PropertyGroup><AssemblyClsCompliant>False</AssemblyClsCompliant></PropertyGroup>";

    pub fn new(id: &'static str, check: &str, fragment: &str, anchor: Query) -> Self {
        Self {
            id,
            check: check.to_string(),
            fragment: fragment.to_string(),
            anchor,
        }
    }

    /// Mark the assembly as not CLS compliant, in a new property group after the first one.
    pub fn cls_compliant() -> Self {
        Self::new(
            Self::CLS_ID,
            Self::CLS_TAG,
            Self::CLS_FRAGMENT,
            Query::descendant("PropertyGroup"),
        )
    }
}

impl Patch for AddPropertyIfAbsent {
    fn id(&self) -> &'static str {
        self.id
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError> {
        if doc.contains(&Query::descendant(&self.check)) {
            debug!("<{}> already present", self.check);
            return Ok(PatchOutcome::default());
        }

        if doc.insert_fragment_as_sibling(&self.anchor, &self.fragment)? {
            Ok(PatchOutcome::edited(1))
        } else {
            let mut outcome = PatchOutcome::default();
            outcome.skip(format!("no {} to insert <{}> after", self.anchor, self.check));
            Ok(outcome)
        }
    }
}
