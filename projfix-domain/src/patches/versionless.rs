use crate::error::PatchError;
use crate::patches::{Patch, PatchOutcome, reference_paths};
use projfix_lookup::{hint_path_of, identity};
use projfix_xml::Document;
use tracing::debug;

/// Reduce versioned reference names (`Foo, Version=1.0, ...`) to their identity (`Foo`).
///
/// With `exclude_external` set, references whose hint path contains `External` keep their
/// full name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripVersion {
    pub exclude_external: bool,
}

impl StripVersion {
    const VERSION_TOKEN: &'static str = "Version=";
    const EXTERNAL_MARKER: &'static str = "External";

    pub fn new(exclude_external: bool) -> Self {
        Self { exclude_external }
    }
}

impl Patch for StripVersion {
    fn id(&self) -> &'static str {
        "versionless"
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError> {
        let mut outcome = PatchOutcome::default();
        for path in reference_paths(doc) {
            let Some(reference) = doc.element_mut(&path) else {
                continue;
            };
            let include = reference.attr("Include").unwrap_or_default().to_string();
            if !include.contains(Self::VERSION_TOKEN) {
                continue;
            }

            if self.exclude_external
                && hint_path_of(reference).is_some_and(|h| h.contains(Self::EXTERNAL_MARKER))
            {
                debug!(reference = %include, "external reference keeps its version");
                outcome.skip(format!("{include}: external"));
                continue;
            }

            let stripped = identity(&include).to_string();
            if stripped == include {
                // `Version=...` is itself the first token; there is nothing left to strip.
                continue;
            }
            debug!(reference = %include, "stripped to {stripped}");
            reference.set_attr("Include", stripped);
            outcome.edits += 1;
        }
        Ok(outcome)
    }
}
