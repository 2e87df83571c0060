//! Merger configuration.

/// Behavior switches for a [`ConfigMerger`](crate::ConfigMerger).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Report records that reuse an id or name, and refuse to write output
    /// if any were found.
    ///
    /// Off by default, for callers that check uniqueness elsewhere.
    pub detect_conflicts: bool,

    /// Spaces per nesting level in written documents, or `None` for compact
    /// output.
    pub indent: Option<usize>,
}

impl MergeOptions {
    /// Options with conflict detection turned on.
    pub fn detecting_conflicts() -> Self {
        Self {
            detect_conflicts: true,
            ..Self::default()
        }
    }

    /// Set the indentation of written documents; `None` writes them compact.
    pub fn with_indent(mut self, indent: Option<usize>) -> Self {
        self.indent = indent;
        self
    }
}
