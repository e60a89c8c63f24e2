//! Patch operations for project files and the batch driver that applies them.
//!
//! Every patch is idempotent: applied to its own output it reports no edits, and the batch
//! driver only writes files a patch actually changed.

mod batch;
mod error;
pub mod patches;

pub use batch::{
    BatchOptions, BatchReport, BatchSummary, FileResult, FileStatus, apply_to_all, render_patch,
};
pub use error::PatchError;
pub use patches::{
    AddPropertyIfAbsent, AddTestProperties, ApplyLookup, FixUnitTestHintPath, FrameworkVersion,
    Patch, PatchOutcome, SetFrameworkVersion, StripVersion,
};
