use crate::error::PatchError;
use crate::patches::{Patch, PatchOutcome, reference_paths};
use projfix_lookup::{HINT_PATH, LookupStore};
use projfix_xml::Document;
use tracing::debug;

/// Overwrite each reference's hint path with the one recorded for its full `Include` name.
///
/// References missing from the store keep their hint path and are noted as skipped.
#[derive(Debug, Clone)]
pub struct ApplyLookup {
    store: LookupStore,
}

impl ApplyLookup {
    pub fn new(store: LookupStore) -> Self {
        Self { store }
    }
}

impl Patch for ApplyLookup {
    fn id(&self) -> &'static str {
        "pathfix"
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError> {
        let mut outcome = PatchOutcome::default();
        for path in reference_paths(doc) {
            let Some(reference) = doc.element_mut(&path) else {
                continue;
            };
            let include = reference.attr("Include").unwrap_or_default().to_string();
            let Some(hint) = reference.child_mut(HINT_PATH) else {
                continue;
            };

            match self.store.get(&include) {
                Some(wanted) => {
                    if hint.text().as_deref().unwrap_or_default() != wanted {
                        debug!(reference = %include, "hint path set to {wanted}");
                        hint.set_text(wanted);
                        outcome.edits += 1;
                    }
                }
                None => {
                    debug!(reference = %include, "not in lookup, hint path left as is");
                    outcome.skip(format!("{include}: not in lookup"));
                }
            }
        }
        Ok(outcome)
    }
}
