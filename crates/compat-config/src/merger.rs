//! Accumulates compat change records from fragments and writes them out.

use crate::archive;
use crate::conflict::{Conflict, ConflictTracker};
use crate::error::{MergeError, Result};
use crate::options::MergeOptions;
use crate::record::{CompatChange, ID_ATTR, NAME_ATTR, Origin};
use crate::view::{ConfigView, project};
use compat_xml::WriteOptions;
use std::io::{self, Read, Seek, Write};

/// Merges compat config fragments into one document.
///
/// Records are kept in the order they were merged. With
/// [`MergeOptions::detect_conflicts`] set, every reused id or name is
/// reported to the error sink as soon as the fragment containing it is
/// merged, and the write operations refuse to produce output while any such
/// conflict exists.
///
/// # Example
///
/// ```rust
/// use compat_config::{ConfigMerger, MergeOptions};
///
/// let mut merger = ConfigMerger::with_error_sink(MergeOptions::detecting_conflicts(), Vec::new());
/// merger.merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE"/></config>"#[..], "a.xml").unwrap();
/// merger.merge(&br#"<config><compat-change id="1235" name="TEST_CHANGE2"/></config>"#[..], "b.xml").unwrap();
///
/// let mut out = Vec::new();
/// merger.write(&mut out).unwrap();
/// let out = String::from_utf8(out).unwrap();
/// assert!(out.contains(r#"<config><compat-change id="1234" name="TEST_CHANGE"/><compat-change id="1235" name="TEST_CHANGE2"/></config>"#));
/// ```
#[derive(Debug)]
pub struct ConfigMerger<E: Write = io::Stderr> {
    options: MergeOptions,
    records: Vec<CompatChange>,
    conflicts: ConflictTracker,
    error_sink: E,
}

impl ConfigMerger {
    /// Create a merger that reports conflicts to standard error.
    pub fn new(options: MergeOptions) -> Self {
        Self::with_error_sink(options, io::stderr())
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new(MergeOptions::default())
    }
}

impl<E: Write> ConfigMerger<E> {
    /// Create a merger that reports conflicts to `error_sink`.
    pub fn with_error_sink(options: MergeOptions, error_sink: E) -> Self {
        Self {
            options,
            records: Vec::new(),
            conflicts: ConflictTracker::new(),
            error_sink,
        }
    }

    /// Merge one fragment document read from `fragment`.
    ///
    /// `source_label` only appears in diagnostics.
    ///
    /// # Errors
    ///
    /// - [`MergeError::Io`] if the stream can't be read, or conflict
    ///   diagnostics can't be written (the fragment is merged regardless);
    /// - [`MergeError::Parse`] if it is not a well-formed document;
    /// - [`MergeError::MissingAttribute`] if conflict detection is on and a
    ///   record has no `id` or `name`.
    ///
    /// In the last two cases nothing from the fragment is merged.
    pub fn merge<R: Read>(&mut self, mut fragment: R, source_label: &str) -> Result<()> {
        let mut bytes = Vec::new();
        fragment.read_to_end(&mut bytes)?;
        self.merge_bytes(&bytes, source_label)
    }

    /// Merge one fragment document already in memory.
    pub fn merge_bytes(&mut self, bytes: &[u8], source_label: &str) -> Result<()> {
        let changes = parse_fragment(bytes, source_label)?;

        if self.options.detect_conflicts {
            for change in &changes {
                require_keys(change)?;
            }
        }

        let count = changes.len();
        let mut found: Vec<Conflict> = Vec::new();
        for change in changes {
            if self.options.detect_conflicts {
                found.extend(self.conflicts.check_change(&change));
            }
            self.records.push(change);
        }

        tracing::debug!(
            source = source_label,
            records = count,
            conflicts = found.len(),
            "merged compat config fragment"
        );

        for conflict in &found {
            conflict.write_diagnostic(&mut self.error_sink)?;
        }
        self.error_sink.flush()?;
        Ok(())
    }

    /// Merge every fragment found in a jar (zip) archive, in archive order.
    ///
    /// Each fragment is labelled `<archive_label>:<entry name>`. Returns the
    /// number of fragments merged.
    pub fn merge_archive<R: Read + Seek>(&mut self, archive: R, archive_label: &str) -> Result<usize> {
        let fragments = archive::read_fragments(archive)?;
        for fragment in &fragments {
            self.merge_bytes(&fragment.contents, &fragment.source_label(archive_label))?;
        }
        Ok(fragments.len())
    }

    /// Write the merged view: every record verbatim, metadata included.
    pub fn write<W: Write>(&self, sink: W) -> Result<()> {
        self.write_view(ConfigView::Merged, sink)
    }

    /// Write the device view: attributes only, metadata stripped.
    pub fn write_device_config<W: Write>(&self, sink: W) -> Result<()> {
        self.write_view(ConfigView::Device, sink)
    }

    /// Write `view` of the records merged so far.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Conflicts`] without writing anything if conflict
    /// detection is on and any conflict has been found.
    pub fn write_view<W: Write>(&self, view: ConfigView, sink: W) -> Result<()> {
        self.ensure_no_conflicts()?;
        let root = project(&self.records, view);
        let options = WriteOptions {
            indent: self.options.indent,
        };
        compat_xml::write_document(&root, sink, options)?;
        Ok(())
    }

    /// Fail with the aggregated conflict count if any conflict was found.
    pub fn ensure_no_conflicts(&self) -> Result<()> {
        let count = self.error_count();
        if self.options.detect_conflicts && count > 0 {
            Err(MergeError::Conflicts { count })
        } else {
            Ok(())
        }
    }

    pub fn records(&self) -> &[CompatChange] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of conflicts found so far. Always zero without detection.
    pub fn error_count(&self) -> usize {
        self.conflicts.error_count()
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn error_sink(&self) -> &E {
        &self.error_sink
    }

    pub fn into_error_sink(self) -> E {
        self.error_sink
    }
}

fn parse_fragment(bytes: &[u8], source_label: &str) -> Result<Vec<CompatChange>> {
    let document = compat_xml::parse_bytes(bytes).map_err(|source| MergeError::Parse {
        source_label: source_label.to_string(),
        source,
    })?;

    let origins: Vec<Origin> = document
        .root
        .all_children()
        .into_iter()
        .map(|child| Origin::new(source_label, document.line_of(child.span)))
        .collect();

    Ok(document
        .into_root()
        .into_children()
        .into_iter()
        .zip(origins)
        .map(|(element, origin)| CompatChange::new(element, origin))
        .collect())
}

fn require_keys(change: &CompatChange) -> Result<()> {
    let missing = if change.id().is_none() {
        ID_ATTR
    } else if change.name().is_none() {
        NAME_ATTR
    } else {
        return Ok(());
    };
    Err(MergeError::MissingAttribute {
        attribute: missing,
        origin: change.origin().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Metadata;

    fn merger() -> ConfigMerger<Vec<u8>> {
        ConfigMerger::with_error_sink(MergeOptions::detecting_conflicts(), Vec::new())
    }

    fn lenient() -> ConfigMerger<Vec<u8>> {
        ConfigMerger::with_error_sink(MergeOptions::default(), Vec::new())
    }

    fn merged(merger: &ConfigMerger<Vec<u8>>) -> String {
        let mut out = Vec::new();
        merger.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn device(merger: &ConfigMerger<Vec<u8>>) -> String {
        let mut out = Vec::new();
        merger.write_device_config(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn errors(merger: &ConfigMerger<Vec<u8>>) -> String {
        String::from_utf8_lossy(merger.error_sink()).into_owned()
    }

    #[test]
    fn test_no_config_to_merge() {
        let merger = merger();
        insta::assert_snapshot!(merged(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config/>
        "#);
    }

    #[test]
    fn test_merge_one_file() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE" /></config>"#[..], "a.xml")
            .unwrap();

        insta::assert_snapshot!(merged(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config><compat-change id="1234" name="TEST_CHANGE"/></config>
        "#);
    }

    #[test]
    fn test_merge_two_files() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE" /></config>"#[..], "a.xml")
            .unwrap();
        merger
            .merge(&br#"<config><compat-change id="1235" name="TEST_CHANGE2" /></config>"#[..], "b.xml")
            .unwrap();

        insta::assert_snapshot!(merged(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config><compat-change id="1234" name="TEST_CHANGE"/><compat-change id="1235" name="TEST_CHANGE2"/></config>
        "#);
        assert!(errors(&merger).is_empty());
    }

    #[test]
    fn test_merge_two_files_metadata() {
        let mut merger = merger();
        merger
            .merge(
                &br#"<config><compat-change id="1234" name="TEST_CHANGE"><meta-data definedIn="some.Class" sourcePosition="some.java:1"/></compat-change></config>"#[..],
                "a.xml",
            )
            .unwrap();
        merger
            .merge(
                &br#"<config><compat-change id="1235" name="TEST_CHANGE2"><meta-data definedIn="other.Class" sourcePosition="other.java:2"/></compat-change></config>"#[..],
                "b.xml",
            )
            .unwrap();

        insta::assert_snapshot!(merged(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config><compat-change id="1234" name="TEST_CHANGE"><meta-data definedIn="some.Class" sourcePosition="some.java:1"/></compat-change><compat-change id="1235" name="TEST_CHANGE2"><meta-data definedIn="other.Class" sourcePosition="other.java:2"/></compat-change></config>
        "#);
        assert_eq!(
            merger.records()[1].metadata(),
            Some(Metadata {
                defined_in: Some("other.Class"),
                source_position: Some("other.java:2"),
            })
        );
    }

    #[test]
    fn test_write_device_config_metadata_stripped() {
        let mut merger = merger();
        merger
            .merge(
                &br#"<config><compat-change id="1234" name="TEST_CHANGE" disabled="true"><meta-data definedIn="some.Class" sourcePosition="some.java:1"/></compat-change></config>"#[..],
                "a.xml",
            )
            .unwrap();

        insta::assert_snapshot!(device(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config><compat-change id="1234" name="TEST_CHANGE" disabled="true"/></config>
        "#);
    }

    #[test]
    fn test_device_view_does_not_alter_records() {
        let mut merger = merger();
        merger
            .merge(
                &br#"<config><compat-change id="1" name="A"><meta-data definedIn="a.B"/></compat-change></config>"#[..],
                "a.xml",
            )
            .unwrap();

        let before = merged(&merger);
        device(&merger);
        assert_eq!(merged(&merger), before);
        assert!(merger.records()[0].metadata().is_some());
    }

    #[test]
    fn test_duplicate_id_detected() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE" /></config>"#[..], "a.xml")
            .unwrap();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE2" /></config>"#[..], "b.xml")
            .unwrap();

        assert!(
            errors(&merger)
                .lines()
                .any(|line| line == "ERROR: Duplicate definitions for compat change with ID 1234"),
            "{}",
            errors(&merger)
        );

        let mut out = Vec::new();
        let err = merger.write(&mut out).unwrap_err();
        assert!(matches!(err, MergeError::Conflicts { count: 1 }));
        assert!(err.to_string().contains("1 error"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_duplicate_name_detected() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE" /></config>"#[..], "a.xml")
            .unwrap();
        merger
            .merge(&br#"<config><compat-change id="1235" name="TEST_CHANGE" /></config>"#[..], "b.xml")
            .unwrap();

        assert!(
            errors(&merger).contains(
                "ERROR: Duplicate definitions for compat change with name TEST_CHANGE\n"
            )
        );

        let mut out = Vec::new();
        let err = merger.write_device_config(&mut out).unwrap_err();
        assert!(matches!(err, MergeError::Conflicts { count: 1 }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_duplicate_id_and_name_counted_separately() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1" name="A" /></config>"#[..], "a.xml")
            .unwrap();
        merger
            .merge(&br#"<config><compat-change id="1" name="A" /></config>"#[..], "b.xml")
            .unwrap();

        assert_eq!(merger.error_count(), 2);
        assert_eq!(errors(&merger).matches("ERROR:").count(), 2);
        assert!(merger.write(io::sink()).unwrap_err().to_string().contains("2 errors"));
    }

    #[test]
    fn test_duplicate_within_one_fragment() {
        let mut merger = merger();
        merger
            .merge(
                &b"<config>\n  <compat-change id=\"1\" name=\"A\"/>\n  <compat-change id=\"1\" name=\"B\"/>\n</config>"[..],
                "one.xml",
            )
            .unwrap();

        let text = errors(&merger);
        assert!(text.contains("first defined at one.xml:2"), "{}", text);
        assert!(text.contains("redefined at one.xml:3"), "{}", text);
        assert_eq!(merger.error_count(), 1);
    }

    #[test]
    fn test_diagnostics_emitted_during_merge() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1" name="A" /></config>"#[..], "a.xml")
            .unwrap();
        merger
            .merge(&br#"<config><compat-change id="1" name="B" /></config>"#[..], "b.xml")
            .unwrap();
        // Visible before any write
        assert!(errors(&merger).contains("with ID 1"));

        merger
            .merge(&br#"<config><compat-change id="2" name="A" /></config>"#[..], "c.xml")
            .unwrap();
        assert_eq!(errors(&merger).matches("ERROR:").count(), 2);
    }

    #[test]
    fn test_duplicates_allowed_without_detection() {
        let mut merger = lenient();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE" /></config>"#[..], "a.xml")
            .unwrap();
        merger
            .merge(&br#"<config><compat-change id="1234" name="TEST_CHANGE" /></config>"#[..], "b.xml")
            .unwrap();

        assert_eq!(merger.error_count(), 0);
        assert!(errors(&merger).is_empty());
        insta::assert_snapshot!(merged(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config><compat-change id="1234" name="TEST_CHANGE"/><compat-change id="1234" name="TEST_CHANGE"/></config>
        "#);
    }

    #[test]
    fn test_missing_keys_allowed_without_detection() {
        let mut merger = lenient();
        merger
            .merge(&br#"<config><compat-change disabled="true"/></config>"#[..], "a.xml")
            .unwrap();
        assert_eq!(merger.len(), 1);
    }

    #[test]
    fn test_parse_error_leaves_state_untouched() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1" name="A" /></config>"#[..], "a.xml")
            .unwrap();

        let err = merger
            .merge(&br#"<config><compat-change id="2" name="B"></config>"#[..], "broken.xml")
            .unwrap_err();
        match err {
            MergeError::Parse { source_label, .. } => assert_eq!(source_label, "broken.xml"),
            other => panic!("Expected Parse error, got {:?}", other),
        }
        assert_eq!(merger.len(), 1);

        let err = merger.merge(&b""[..], "empty.xml").unwrap_err();
        assert!(matches!(
            err,
            MergeError::Parse {
                source: compat_xml::Error::EmptyDocument,
                ..
            }
        ));
        assert_eq!(merger.len(), 1);
    }

    #[test]
    fn test_text_outside_root_is_a_parse_error() {
        let mut merger = merger();
        let err = merger
            .merge(
                &br#"junk<config><compat-change id="1" name="A"/></config>trailing"#[..],
                "a.xml",
            )
            .unwrap_err();

        assert!(matches!(err, MergeError::Parse { .. }), "{:?}", err);
        assert!(merger.is_empty());
        assert_eq!(merger.error_count(), 0);
    }

    #[test]
    fn test_attribute_line_breaks_written_as_references() {
        let mut merger = merger();
        merger
            .merge(
                &br#"<config><compat-change id="1" name="A" description="line1&#10;line2"/></config>"#[..],
                "a.xml",
            )
            .unwrap();

        insta::assert_snapshot!(merged(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config><compat-change id="1" name="A" description="line1&#10;line2"/></config>
        "#);
    }

    #[test]
    fn test_missing_attribute_rejects_whole_fragment() {
        let mut merger = merger();
        let err = merger
            .merge(
                &b"<config>\n<compat-change id=\"1\" name=\"A\"/>\n<compat-change id=\"2\"/>\n</config>"[..],
                "a.xml",
            )
            .unwrap_err();

        match err {
            MergeError::MissingAttribute { attribute, origin } => {
                assert_eq!(attribute, "name");
                assert_eq!(origin, Origin::new("a.xml", 3));
            }
            other => panic!("Expected MissingAttribute error, got {:?}", other),
        }
        assert!(merger.is_empty());
        // The first record was never registered either
        assert!(
            merger
                .merge(&br#"<config><compat-change id="1" name="A"/></config>"#[..], "b.xml")
                .is_ok()
        );
        assert_eq!(merger.error_count(), 0);
    }

    #[test]
    fn test_write_rechecks_current_state() {
        let mut merger = merger();
        merger
            .merge(&br#"<config><compat-change id="1" name="A" /></config>"#[..], "a.xml")
            .unwrap();
        assert!(merger.write(io::sink()).is_ok());

        merger
            .merge(&br#"<config><compat-change id="1" name="B" /></config>"#[..], "b.xml")
            .unwrap();
        assert!(matches!(
            merger.write(io::sink()),
            Err(MergeError::Conflicts { count: 1 })
        ));
    }

    #[test]
    fn test_indented_output() {
        let mut merger = ConfigMerger::with_error_sink(
            MergeOptions::detecting_conflicts().with_indent(Some(2)),
            Vec::new(),
        );
        merger
            .merge(&br#"<config><compat-change id="1" name="A"/><compat-change id="2" name="B"/></config>"#[..], "a.xml")
            .unwrap();

        insta::assert_snapshot!(device(&merger).trim_end(), @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <config>
          <compat-change id="1" name="A"/>
          <compat-change id="2" name="B"/>
        </config>
        "#);
    }

    #[test]
    fn test_merge_archive_labels_entries() {
        use std::io::Cursor;
        use zip::ZipWriter;
        use zip::write::SimpleFileOptions;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in [
            ("a_compat_config.xml", "<config>\n<compat-change id=\"1\" name=\"A\"/>\n</config>"),
            ("README", "ignored"),
            ("b_compat_config.xml", "<config>\n<compat-change id=\"1\" name=\"B\"/>\n</config>"),
        ] {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        let jar = zip.finish().unwrap();

        let mut merger = merger();
        let merged_count = merger.merge_archive(Cursor::new(jar.into_inner()), "framework.jar").unwrap();
        assert_eq!(merged_count, 2);
        assert_eq!(merger.len(), 2);
        assert!(
            errors(&merger).contains("first defined at framework.jar:a_compat_config.xml:2"),
            "{}",
            errors(&merger)
        );
        assert!(errors(&merger).contains("redefined at framework.jar:b_compat_config.xml:2"));
    }

    #[test]
    fn test_record_origins() {
        let mut merger = lenient();
        merger
            .merge(&b"<config>\n\n  <compat-change id=\"7\" name=\"X\"/>\n</config>"[..], "frag.xml")
            .unwrap();
        assert_eq!(merger.records()[0].origin(), &Origin::new("frag.xml", 3));
    }
}
