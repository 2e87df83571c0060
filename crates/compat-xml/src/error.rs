//! Error types for XML parsing and writing.

use crate::types::SourceSpan;
use thiserror::Error;

/// Result type alias for compat-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing XML.
#[derive(Debug, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message}{}", at_byte(.position))]
    XmlSyntax {
        message: String,
        /// Byte offset where the error occurred.
        position: Option<u64>,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof {
        /// What was expected when EOF was encountered.
        expected: String,
        span: Option<SourceSpan>,
    },

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        span: Option<SourceSpan>,
    },

    /// Invalid XML structure.
    #[error("Invalid XML structure: {message}")]
    InvalidStructure {
        message: String,
        span: Option<SourceSpan>,
    },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// Multiple root elements.
    #[error("Invalid XML: multiple root elements")]
    MultipleRoots { span: Option<SourceSpan> },

    /// The input is not UTF-8, or declares an encoding other than UTF-8.
    #[error("Unsupported encoding: {message}")]
    Encoding { message: String },

    /// Failure writing serialized XML to its sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn at_byte(position: &Option<u64>) -> String {
    position
        .map(|pos| format!(" at byte {}", pos))
        .unwrap_or_default()
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io) => match std::sync::Arc::try_unwrap(io) {
                Ok(io) => Error::Io(io),
                Err(shared) => Error::Io(std::io::Error::new(shared.kind(), shared.to_string())),
            },
            other => Error::XmlSyntax {
                message: other.to_string(),
                position: None,
            },
        }
    }
}
