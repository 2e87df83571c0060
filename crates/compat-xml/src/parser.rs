//! XML parser that builds [`XmlDocument`] trees.

use crate::{Error, Result, SourceSpan, XmlAttribute, XmlChild, XmlChildren, XmlDocument, XmlElement};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Parse XML from a string, producing an [`XmlDocument`].
///
/// # Example
///
/// ```rust
/// use compat_xml::parse;
///
/// let doc = parse(r#"<config><compat-change id="1"/></config>"#).unwrap();
/// assert_eq!(doc.root.name, "config");
/// assert_eq!(doc.root.all_children()[0].get_attribute("id"), Some("1"));
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed or has no root element.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

/// Parse XML from raw bytes, which must be UTF-8.
///
/// A leading byte order mark is accepted and skipped.
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    let content = std::str::from_utf8(bytes).map_err(|err| Error::Encoding {
        message: format!("input is not valid UTF-8: {}", err),
    })?;
    parse(content.strip_prefix('\u{feff}').unwrap_or(content))
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The source content being parsed.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// A node being constructed during parsing.
struct BuildNode {
    name: String,
    name_span: SourceSpan,
    attributes: Vec<XmlAttribute>,
    /// Byte offset where this element started (the `<` character).
    start_offset: usize,
    children: Vec<XmlChild>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            let completed = match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.handle_start(&e, event_start)?;
                    None
                }
                Ok(Event::End(e)) => Some(self.handle_end(&e)?),
                Ok(Event::Empty(e)) => Some(self.handle_empty(&e, event_start)?),
                Ok(Event::Text(e)) => {
                    self.handle_text(&e, event_start)?;
                    None
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(&e, event_start)?;
                    None
                }
                Ok(Event::Decl(e)) => {
                    check_declared_encoding(&e)?;
                    None
                }
                // Comments, processing instructions and DOCTYPE carry no records
                Ok(Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => None,
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            };

            if let Some(element) = completed {
                match self.stack.last_mut() {
                    Some(parent) => parent.children.push(XmlChild::Element(element)),
                    None if root.is_some() => {
                        return Err(Error::MultipleRoots {
                            span: Some(element.span),
                        });
                    }
                    None => root = Some(element),
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.name),
                span: Some(node.name_span),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        Ok(XmlDocument::new(root, self.source))
    }

    fn handle_start(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name_start = event_start + 1; // Skip '<'
        let name_span = SourceSpan::new(name_start, name_start + name.len());
        let attributes = self.parse_attributes(e, event_start)?;

        self.stack.push(BuildNode {
            name,
            name_span,
            attributes,
            start_offset: event_start,
            children: Vec::new(),
        });

        Ok(())
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>) -> Result<XmlElement> {
        let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        let node = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
            message: format!("Unexpected closing tag </{}>", end_name),
            span: None,
        })?;

        if node.name != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.name,
                found: end_name,
                span: Some(node.name_span),
            });
        }

        let end_offset = self.reader.buffer_position() as usize;

        Ok(XmlElement {
            name: node.name,
            attributes: node.attributes,
            children: finalize_children(node.children),
            span: SourceSpan::new(node.start_offset, end_offset),
        })
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<XmlElement> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attributes = self.parse_attributes(e, event_start)?;
        let end_offset = self.reader.buffer_position() as usize;

        Ok(XmlElement {
            name,
            attributes,
            children: XmlChildren::Empty,
            span: SourceSpan::new(event_start, end_offset),
        })
    }

    fn handle_text(&mut self, e: &BytesText<'_>, event_start: usize) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid text content: {}", err),
            position: Some(event_start as u64),
        })?;

        let end_offset = self.reader.buffer_position() as usize;
        let span = SourceSpan::new(event_start, end_offset);
        match self.stack.last_mut() {
            Some(node) => {
                node.children.push(XmlChild::Text {
                    content: text.into_owned(),
                    span,
                });
                Ok(())
            }
            // Only whitespace may surround the root element
            None if text.trim().is_empty() => Ok(()),
            None => Err(Error::InvalidStructure {
                message: "text outside the root element".to_string(),
                span: Some(span),
            }),
        }
    }

    fn handle_cdata(&mut self, e: &BytesCData<'_>, event_start: usize) -> Result<()> {
        let text = String::from_utf8_lossy(e.as_ref()).into_owned();
        let end_offset = self.reader.buffer_position() as usize;
        let span = SourceSpan::new(event_start, end_offset);

        let node = self.stack.last_mut().ok_or_else(|| Error::InvalidStructure {
            message: "CDATA section outside the root element".to_string(),
            span: Some(span),
        })?;
        node.children.push(XmlChild::Text {
            content: text,
            span,
        });
        Ok(())
    }

    fn parse_attributes(&self, e: &BytesStart<'_>, tag_start: usize) -> Result<Vec<XmlAttribute>> {
        let mut attributes = Vec::new();

        // Tag content starts after '<'
        let content_start = tag_start + 1;
        let tag_str = String::from_utf8_lossy(e.as_ref());

        // Attribute names are searched for left to right, each search starting
        // after the previous attribute, so a name can't match inside an
        // earlier value.
        let mut cursor = e.name().as_ref().len();

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| Error::XmlSyntax {
                message: format!("Attribute error: {}", err),
                position: Some(tag_start as u64),
            })?;

            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: Some(tag_start as u64),
            })?;

            let span = match tag_str.get(cursor..).and_then(|rest| rest.find(&name)) {
                Some(rel_pos) => {
                    let name_start = cursor + rel_pos;
                    cursor = name_start + name.len() + attr.value.len();
                    SourceSpan::new(content_start + name_start, content_start + name_start + name.len())
                }
                None => SourceSpan::new(content_start, content_start + 1),
            };

            attributes.push(XmlAttribute {
                name,
                value: value.into_owned(),
                span,
            });
        }

        Ok(attributes)
    }
}

fn check_declared_encoding(decl: &BytesDecl<'_>) -> Result<()> {
    let Some(encoding) = decl.encoding() else {
        return Ok(());
    };
    let encoding = encoding.map_err(|err| Error::XmlSyntax {
        message: format!("Invalid XML declaration: {}", err),
        position: None,
    })?;
    let encoding = String::from_utf8_lossy(&encoding);
    if encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8") {
        Ok(())
    } else {
        Err(Error::Encoding {
            message: format!("document declares encoding '{}', only UTF-8 is supported", encoding),
        })
    }
}

/// Whitespace-only text is layout unless the element also holds real text,
/// in which case every text child is kept as written.
fn finalize_children(mut children: Vec<XmlChild>) -> XmlChildren {
    let has_text = children
        .iter()
        .any(|c| matches!(c, XmlChild::Text { content, .. } if !content.trim().is_empty()));
    if !has_text {
        children.retain(|c| matches!(c, XmlChild::Element(_)));
    }

    let all_elements = children.iter().all(|c| matches!(c, XmlChild::Element(_)));

    if children.is_empty() {
        XmlChildren::Empty
    } else if all_elements {
        XmlChildren::Elements(
            children
                .into_iter()
                .filter_map(|c| match c {
                    XmlChild::Element(e) => Some(e),
                    XmlChild::Text { .. } => None,
                })
                .collect(),
        )
    } else if children.len() == 1 {
        match children.into_iter().next() {
            Some(XmlChild::Text { content, span }) => XmlChildren::Text { content, span },
            Some(XmlChild::Element(e)) => XmlChildren::Elements(vec![e]),
            None => XmlChildren::Empty,
        }
    } else {
        XmlChildren::Mixed(children)
    }
}
