//! Error types for merging compat config fragments.

use crate::record::Origin;
use thiserror::Error;

/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors raised by [`ConfigMerger`](crate::ConfigMerger).
#[derive(Debug, Error)]
pub enum MergeError {
    /// A fragment is not a well-formed document. Nothing from it was merged.
    #[error("Failed to parse compat config fragment {source_label}")]
    Parse {
        source_label: String,
        #[source]
        source: compat_xml::Error,
    },

    /// A record lacks a key needed for duplicate detection.
    #[error("Compat change at {origin} is missing required attribute '{attribute}'")]
    MissingAttribute {
        attribute: &'static str,
        origin: Origin,
    },

    /// Duplicates were found; no output was produced.
    #[error("Failed to merge compat config: {count} {}", error_noun(.count))]
    Conflicts { count: usize },

    /// An archive of fragments could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Serializing a view failed.
    #[error("Failed to write compat config: {0}")]
    Xml(#[from] compat_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn error_noun(count: &usize) -> &'static str {
    if *count == 1 { "error" } else { "errors" }
}

/// Errors raised while extracting fragments from an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}
