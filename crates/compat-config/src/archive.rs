//! Extraction of compat config fragments from jar archives.
//!
//! A jar is a zip archive; any entry whose name ends in
//! [`FRAGMENT_SUFFIX`] is a fragment, wherever it sits in the archive.

use crate::error::ArchiveError;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Entry-name suffix identifying a compat config fragment.
pub const FRAGMENT_SUFFIX: &str = "_compat_config.xml";

/// One fragment entry read out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Full entry name within the archive.
    pub entry_name: String,
    pub contents: Vec<u8>,
}

impl Fragment {
    /// Label identifying this entry in diagnostics, `<archive>:<entry>`.
    pub fn source_label(&self, archive_label: &str) -> String {
        format!("{}:{}", archive_label, self.entry_name)
    }
}

pub fn is_fragment_name(entry_name: &str) -> bool {
    entry_name.ends_with(FRAGMENT_SUFFIX)
}

/// Read every fragment entry of the archive, in archive order.
///
/// Directory entries are skipped even if their name matches.
pub fn read_fragments<R: Read + Seek>(reader: R) -> Result<Vec<Fragment>, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut fragments = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !is_fragment_name(entry.name()) {
            continue;
        }

        let entry_name = entry.name().to_string();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        tracing::trace!(entry = %entry_name, bytes = contents.len(), "read fragment");
        fragments.push(Fragment {
            entry_name,
            contents,
        });
    }

    Ok(fragments)
}

/// Open the archive at `path` and read its fragments.
pub fn read_fragments_from_path(path: &Path) -> Result<Vec<Fragment>, ArchiveError> {
    let file = File::open(path)?;
    read_fragments(BufReader::new(file))
}
