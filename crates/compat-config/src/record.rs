//! The compat-change record model.

use compat_xml::{XmlAttribute, XmlElement};
use std::fmt;

/// Element name of a compat change record.
pub const CHANGE_ELEMENT: &str = "compat-change";
/// Element name of the developer metadata child of a record.
pub const METADATA_ELEMENT: &str = "meta-data";

pub const ID_ATTR: &str = "id";
pub const NAME_ATTR: &str = "name";
pub const DISABLED_ATTR: &str = "disabled";
pub const LOGGING_ONLY_ATTR: &str = "loggingOnly";
pub const ENABLE_AFTER_ATTR: &str = "enableAfterTargetSdk";
pub const DESCRIPTION_ATTR: &str = "description";
pub const DEFINED_IN_ATTR: &str = "definedIn";
pub const SOURCE_POSITION_ATTR: &str = "sourcePosition";

/// Where a record was read from: the caller's source label and the 1-based
/// line of the record within that fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub label: String,
    pub line: usize,
}

impl Origin {
    pub fn new(label: impl Into<String>, line: usize) -> Self {
        Self {
            label: label.into(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.line)
    }
}

/// Developer-only provenance attached to a record.
///
/// Never validated: both fields are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata<'a> {
    pub defined_in: Option<&'a str>,
    pub source_position: Option<&'a str>,
}

/// One compat change definition, stored as the element it was read from.
///
/// The element is kept exactly as parsed (attributes in order, metadata and
/// any other children included). The accessors below are read-only views
/// over it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatChange {
    element: XmlElement,
    origin: Origin,
}

impl CompatChange {
    pub fn new(element: XmlElement, origin: Origin) -> Self {
        Self { element, origin }
    }

    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.element.attributes
    }

    /// The `id` attribute, verbatim.
    pub fn id(&self) -> Option<&str> {
        self.element.get_attribute(ID_ATTR)
    }

    /// The `id` attribute as an unsigned integer, if it is one.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id().and_then(|id| id.trim().parse().ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.element.get_attribute(NAME_ATTR)
    }

    pub fn is_disabled(&self) -> bool {
        self.flag(DISABLED_ATTR)
    }

    pub fn is_logging_only(&self) -> bool {
        self.flag(LOGGING_ONLY_ATTR)
    }

    /// Target SDK after which the change is enabled, when present and numeric.
    pub fn enable_after_target_sdk(&self) -> Option<u32> {
        self.element
            .get_attribute(ENABLE_AFTER_ATTR)
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn description(&self) -> Option<&str> {
        self.element.get_attribute(DESCRIPTION_ATTR)
    }

    /// The first `meta-data` child, if any.
    pub fn metadata(&self) -> Option<Metadata<'_>> {
        self.element
            .get_children(METADATA_ELEMENT)
            .first()
            .map(|meta| Metadata {
                defined_in: meta.get_attribute(DEFINED_IN_ATTR),
                source_position: meta.get_attribute(SOURCE_POSITION_ATTR),
            })
    }

    fn flag(&self, attr: &str) -> bool {
        self.element
            .get_attribute(attr)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}
