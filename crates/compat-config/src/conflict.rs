//! Duplicate id/name tracking across merged fragments.

use crate::record::{CompatChange, Origin};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::io::{self, Write};

/// Which key of a record collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    Id,
    Name,
}

impl ConflictKind {
    fn label(self) -> &'static str {
        match self {
            ConflictKind::Id => "ID",
            ConflictKind::Name => "name",
        }
    }
}

/// A record whose id or name was already defined by an earlier record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub key: String,
    /// Where the key was first defined.
    pub first: Origin,
    /// Where it was defined again.
    pub duplicate: Origin,
}

impl Conflict {
    /// Write the diagnostic for this conflict: one `ERROR:` line followed by
    /// the two definition sites.
    pub fn write_diagnostic<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        writeln!(sink, "ERROR: {}", self)?;
        writeln!(sink, "  first defined at {}", self.first)?;
        writeln!(sink, "  redefined at {}", self.duplicate)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicate definitions for compat change with {} {}",
            self.kind.label(),
            self.key
        )
    }
}

/// First definition site of every id and name seen so far, plus the number
/// of duplicates found.
///
/// A key's first origin is never replaced: later definitions are only
/// counted and reported.
#[derive(Debug, Default)]
pub struct ConflictTracker {
    ids: HashMap<String, Origin>,
    names: HashMap<String, Origin>,
    errors: usize,
}

impl ConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` as defined at `origin`, or report a conflict if it was
    /// defined before.
    pub fn check(&mut self, kind: ConflictKind, key: &str, origin: &Origin) -> Option<Conflict> {
        let seen = match kind {
            ConflictKind::Id => &mut self.ids,
            ConflictKind::Name => &mut self.names,
        };

        match seen.entry(key.to_string()) {
            Entry::Occupied(first) => {
                self.errors += 1;
                Some(Conflict {
                    kind,
                    key: key.to_string(),
                    first: first.get().clone(),
                    duplicate: origin.clone(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(origin.clone());
                None
            }
        }
    }

    /// Check the id and then the name of `change`, independently.
    ///
    /// Missing keys are skipped.
    pub fn check_change(&mut self, change: &CompatChange) -> Vec<Conflict> {
        let keys = [
            (ConflictKind::Id, change.id()),
            (ConflictKind::Name, change.name()),
        ];
        keys.into_iter()
            .filter_map(|(kind, key)| self.check(kind, key?, change.origin()))
            .collect()
    }

    /// Number of duplicates found so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }
}
