/// Typesetting service failure.
#[derive(Debug, thiserror::Error)]
pub enum TypesetError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("typesetting server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("typesetting server returned an empty response")]
    Empty,
}

impl From<TypesetError> for inkpost_renderer::ExtensionError {
    fn from(e: TypesetError) -> Self {
        Self::Typeset(Box::new(e))
    }
}
