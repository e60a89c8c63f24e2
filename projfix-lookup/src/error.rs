use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The lookup file is not a flat JSON object of string to string.
    #[error(
        "{path} is not a valid reference lookup ({message}); check for unquoted keys, trailing commas or non-string values"
    )]
    Format { path: String, message: String },

    /// The file enumerator could not build or walk its glob.
    #[error("file pattern error: {message}")]
    Pattern { message: String },

    #[error(transparent)]
    Document(#[from] projfix_xml::DocError),
}

impl LookupError {
    /// Errors that must stop a run before any project file is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(self, LookupError::Format { .. } | LookupError::Io(_))
    }
}
