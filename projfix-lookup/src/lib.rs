//! Reference lookup for projfix.
//!
//! A lookup store maps a reference name (the `Include` of a `<Reference>`) to the hint path
//! the build should use for it. Stores are aggregated from a source tree, persisted as sorted
//! JSON, hand-edited or remapped, then loaded again to rewrite hint paths across the tree.

mod error;
mod files;
mod reference;
mod store;

pub use error::LookupError;
pub use files::{PROJECT_PATTERN, TEST_PROJECT_PATTERN, find_project_files};
pub use reference::{
    HINT_PATH, REFERENCE, extract_hint_paths, hint_path_of, identity, is_same_reference,
};
pub use store::{LookupStore, PACKAGE_LIB_PATTERN, PACKAGE_VAR_TEMPLATE, RemapRule};
