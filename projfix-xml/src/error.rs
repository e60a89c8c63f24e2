//! Error types for projfix-xml.
//!
//! Parse and I/O failures are per-file: callers driving a batch log them and move on.
//! Structure failures mean an edit needed an element the document does not have.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocError {
    /// The file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not well-formed XML.
    #[error("xml parse error in {origin}: {message}")]
    Parse {
        /// File path, or `<fragment>` / `<memory>` for in-memory input.
        origin: String,
        message: String,
    },

    /// An edit required an element that is missing from the tree.
    #[error("structure error: {message}")]
    Structure { message: String },

    /// A query path could not be parsed.
    #[error("invalid query '{query}': {message}")]
    Query { query: String, message: String },
}

impl DocError {
    pub(crate) fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        DocError::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, DocError::Parse { .. })
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, DocError::Structure { .. })
    }
}

pub type DocResult<T> = Result<T, DocError>;
