//! Merging of compat change configuration fragments.
//!
//! Build tooling emits one small `<config>` document per module, each listing
//! the `<compat-change>` records that module defines. This crate combines any
//! number of those fragments into:
//!
//! - the merged config, with every record verbatim (developer metadata
//!   included), and
//! - the device config, with each record reduced to its attributes.
//!
//! Fragments can be merged from any reader, or pulled out of jar archives by
//! their [`FRAGMENT_SUFFIX`]. When conflict detection is enabled every id and
//! name must be unique across all merged records; duplicates are reported as
//! they are found and block all output.
//!
//! # Example
//!
//! ```rust
//! use compat_config::{ConfigMerger, MergeError, MergeOptions};
//!
//! let mut merger = ConfigMerger::with_error_sink(MergeOptions::detecting_conflicts(), Vec::new());
//! merger.merge(&br#"<config><compat-change id="1" name="A"/></config>"#[..], "a.xml").unwrap();
//! merger.merge(&br#"<config><compat-change id="1" name="B"/></config>"#[..], "b.xml").unwrap();
//!
//! let err = merger.write(Vec::new()).unwrap_err();
//! assert!(matches!(err, MergeError::Conflicts { count: 1 }));
//! ```

pub mod archive;
pub mod conflict;
pub mod error;
pub mod merger;
pub mod options;
pub mod record;
pub mod view;

pub use archive::{FRAGMENT_SUFFIX, Fragment, read_fragments, read_fragments_from_path};
pub use conflict::{Conflict, ConflictKind, ConflictTracker};
pub use error::{ArchiveError, MergeError, Result};
pub use merger::ConfigMerger;
pub use options::MergeOptions;
pub use record::{CompatChange, Metadata, Origin};
pub use view::{CONFIG_ROOT, ConfigView, project};
