//! Core types for source-tracked XML trees.

/// A byte range in the source text a node was parsed from.
///
/// Nodes built in memory rather than parsed carry the default (empty) span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// Byte offset of the first byte (inclusive).
    pub start: usize,
    /// Byte offset one past the last byte (exclusive).
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A location in source text (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in bytes)
    pub column: usize,
}

impl Location {
    /// The 1-based line number, as shown to users.
    pub fn line(&self) -> usize {
        self.row + 1
    }
}

/// A parsed XML document.
///
/// Keeps the root element together with a line index of the source, so
/// spans on any node can be turned into line/column locations after the
/// source text itself is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// The root element of the document.
    pub root: XmlElement,

    /// Byte offsets at which each line of the source starts.
    line_starts: Vec<usize>,
}

impl XmlDocument {
    pub fn new(root: XmlElement, source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { root, line_starts }
    }

    /// Convert a byte offset in the source to a [`Location`].
    ///
    /// Offsets past the end of the source resolve to the last line.
    pub fn location(&self, offset: usize) -> Location {
        let row = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(row).copied().unwrap_or(0);
        Location {
            offset,
            row,
            column: offset.saturating_sub(line_start),
        }
    }

    /// The 1-based line on which `span` starts.
    pub fn line_of(&self, span: SourceSpan) -> usize {
        self.location(span.start).line()
    }

    /// Take the root element, dropping the line index.
    pub fn into_root(self) -> XmlElement {
        self.root
    }
}

/// An XML element with source location tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// The qualified name of the element, prefix included (e.g. `csl:text`).
    ///
    /// Kept verbatim so that writing the element back reproduces the tag.
    pub name: String,

    /// Attributes of this element, in source order.
    pub attributes: Vec<XmlAttribute>,

    /// Child content of this element.
    pub children: XmlChildren,

    /// Source span of the entire element, from `<` to the closing `>`.
    pub span: SourceSpan,
}

/// An XML attribute with source location tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The qualified name of the attribute.
    pub name: String,

    /// The attribute value (after unescaping XML entities).
    pub value: String,

    /// Source span of the attribute name.
    pub span: SourceSpan,
}

/// Children of an XML element.
///
/// In element-only content, whitespace-only text is not kept, so indentation
/// in the source never shows up here. Once an element holds any other text,
/// all of its text children are kept verbatim, whitespace included.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlChildren {
    /// Element contains only child elements.
    Elements(Vec<XmlElement>),

    /// Element contains only text content.
    Text {
        /// The text content (after unescaping XML entities).
        content: String,
        span: SourceSpan,
    },

    /// Element contains mixed content (text and elements).
    Mixed(Vec<XmlChild>),

    /// Element is empty (no content).
    Empty,
}

/// A single child in mixed content.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlChild {
    Element(XmlElement),
    Text { content: String, span: SourceSpan },
}

impl XmlElement {
    /// Create a new empty element with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: XmlChildren::Empty,
            span: SourceSpan::default(),
        }
    }

    /// Create an empty element carrying the given attributes.
    pub fn with_attributes(name: impl Into<String>, attributes: Vec<XmlAttribute>) -> Self {
        Self {
            attributes,
            ..Self::new(name)
        }
    }

    /// Create an element with child elements.
    pub fn with_elements(name: impl Into<String>, children: Vec<XmlElement>) -> Self {
        let children = if children.is_empty() {
            XmlChildren::Empty
        } else {
            XmlChildren::Elements(children)
        };
        Self {
            children,
            ..Self::new(name)
        }
    }

    /// Get an attribute value by name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get child elements by name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.all_children()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// Get all child elements (ignoring text in mixed content).
    pub fn all_children(&self) -> Vec<&XmlElement> {
        match &self.children {
            XmlChildren::Elements(elements) => elements.iter().collect(),
            XmlChildren::Mixed(children) => children
                .iter()
                .filter_map(|c| match c {
                    XmlChild::Element(e) => Some(e),
                    XmlChild::Text { .. } => None,
                })
                .collect(),
            XmlChildren::Text { .. } | XmlChildren::Empty => vec![],
        }
    }

    /// Consume the element and return its child elements in order.
    pub fn into_children(self) -> Vec<XmlElement> {
        match self.children {
            XmlChildren::Elements(elements) => elements,
            XmlChildren::Mixed(children) => children
                .into_iter()
                .filter_map(|c| match c {
                    XmlChild::Element(e) => Some(e),
                    XmlChild::Text { .. } => None,
                })
                .collect(),
            XmlChildren::Text { .. } | XmlChildren::Empty => Vec::new(),
        }
    }
}

impl XmlAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            span: SourceSpan::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_get_attribute() {
        let element =
            XmlElement::with_attributes("test", vec![XmlAttribute::new("name", "value")]);

        assert_eq!(element.get_attribute("name"), Some("value"));
        assert_eq!(element.get_attribute("missing"), None);
    }

    #[test]
    fn test_element_children() {
        let parent = XmlElement::with_elements("parent", vec![XmlElement::new("child")]);

        assert_eq!(parent.get_children("child").len(), 1);
        assert_eq!(parent.into_children()[0].name, "child");
    }

    #[test]
    fn test_with_no_elements_is_empty() {
        let parent = XmlElement::with_elements("config", vec![]);
        assert_eq!(parent.children, XmlChildren::Empty);
        assert!(parent.all_children().is_empty());
    }

    #[test]
    fn test_document_location() {
        let source = "<a>\n  <b/>\n</a>";
        let doc = XmlDocument::new(XmlElement::new("a"), source);

        let loc = doc.location(0);
        assert_eq!((loc.row, loc.column), (0, 0));

        // "<b/>" starts after "<a>\n  "
        let loc = doc.location(6);
        assert_eq!((loc.row, loc.column), (1, 2));
        assert_eq!(loc.line(), 2);

        assert_eq!(doc.line_of(SourceSpan::new(11, 15)), 3);
    }
}
