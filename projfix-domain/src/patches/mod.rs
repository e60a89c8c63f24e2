use crate::error::PatchError;
use projfix_lookup::{PROJECT_PATTERN, REFERENCE};
use projfix_xml::{Document, NodePath, Query};

mod cls;
mod framework;
mod hint_paths;
mod qtest;
mod unittest;
mod versionless;

pub use cls::AddPropertyIfAbsent;
pub use framework::{FrameworkVersion, SetFrameworkVersion};
pub use hint_paths::ApplyLookup;
pub use qtest::AddTestProperties;
pub use unittest::{FixUnitTestHintPath, UNIT_TEST_FRAMEWORK, UNIT_TEST_HINT_PATH};
pub use versionless::StripVersion;

/// An idempotent edit of one project file.
///
/// `apply` mutates the tree only; the caller decides whether to write it back. Applying a
/// patch to its own output must report no edits.
pub trait Patch {
    /// Stable identifier, used in logs and reports.
    fn id(&self) -> &'static str;

    /// File-name glob selecting the files this patch runs on.
    fn file_pattern(&self) -> &str {
        PROJECT_PATTERN
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError>;
}

/// What a patch did to one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Number of elements or attributes changed.
    pub edits: usize,
    /// Things deliberately left alone, e.g. a reference missing from the lookup.
    pub skipped: Vec<String>,
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        self.edits > 0
    }

    pub(crate) fn edited(edits: usize) -> Self {
        Self {
            edits,
            skipped: Vec::new(),
        }
    }

    pub(crate) fn skip(&mut self, note: impl Into<String>) {
        self.skipped.push(note.into());
    }
}

/// Paths of every `Reference` with an `Include`, collected before any mutation.
pub(crate) fn reference_paths(doc: &Document) -> Vec<NodePath> {
    doc.select_paths(&Query::descendant(REFERENCE).with_attr("Include"))
}
