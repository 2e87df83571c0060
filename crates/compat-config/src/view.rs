//! The merged and device projections of a record sequence.

use crate::record::{CHANGE_ELEMENT, CompatChange};
use compat_xml::XmlElement;

/// Root element of every compat config document.
pub const CONFIG_ROOT: &str = "config";

/// Which document to produce from the merged records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigView {
    /// Every record verbatim, developer metadata included.
    Merged,
    /// Attributes only; metadata and all other children are dropped.
    Device,
}

/// Build the `<config>` root for `view` over `records`, in order.
///
/// This is a pure function of the records: both views are derived from the
/// same sequence and nothing is mutated.
pub fn project(records: &[CompatChange], view: ConfigView) -> XmlElement {
    let children = records
        .iter()
        .map(|record| match view {
            ConfigView::Merged => record.element().clone(),
            ConfigView::Device => device_record(record),
        })
        .collect();
    XmlElement::with_elements(CONFIG_ROOT, children)
}

fn device_record(record: &CompatChange) -> XmlElement {
    XmlElement::with_attributes(CHANGE_ELEMENT, record.attributes().to_vec())
}
