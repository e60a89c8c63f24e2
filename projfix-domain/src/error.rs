//! Error types for projfix-domain.
//!
//! Two classes of failure:
//! - Preconditions (exit code 2): a bad user parameter or an unusable lookup file. These are
//!   checked before a batch opens any project file.
//! - Runtime errors (exit code 1): a project file that cannot be read, parsed or patched.

use projfix_lookup::LookupError;
use projfix_xml::DocError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    /// A user-supplied parameter is malformed, e.g. a framework version that is not `v4.5`-like.
    #[error("invalid parameter: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Document(#[from] DocError),
}

impl PatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        PatchError::Validation {
            message: message.into(),
        }
    }

    /// Returns true if this error must stop a run before any file is touched.
    pub fn is_precondition(&self) -> bool {
        match self {
            PatchError::Validation { .. } => true,
            PatchError::Lookup(e) => e.is_precondition(),
            PatchError::Document(_) => false,
        }
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_precondition() { 2 } else { 1 }
    }
}
