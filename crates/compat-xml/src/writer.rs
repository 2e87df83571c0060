//! Serialization of [`XmlElement`] trees back to XML text.

use crate::{Result, XmlChild, XmlChildren, XmlElement};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::Write;

/// Options controlling how documents are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level, or `None` for compact output.
    pub indent: Option<usize>,
}

impl WriteOptions {
    pub fn compact() -> Self {
        Self { indent: None }
    }

    pub fn indented(spaces: usize) -> Self {
        Self {
            indent: Some(spaces),
        }
    }
}

/// Write `root` as a complete UTF-8 document, XML declaration included.
///
/// # Example
///
/// ```rust
/// use compat_xml::{WriteOptions, XmlAttribute, XmlElement, write_document};
///
/// let root = XmlElement::with_elements(
///     "config",
///     vec![XmlElement::with_attributes("compat-change", vec![XmlAttribute::new("id", "1")])],
/// );
/// let mut out = Vec::new();
/// write_document(&root, &mut out, WriteOptions::compact()).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<config><compat-change id=\"1\"/></config>\n"
/// );
/// ```
pub fn write_document<W: Write>(root: &XmlElement, sink: W, options: WriteOptions) -> Result<()> {
    let mut writer = match options.indent {
        Some(spaces) => Writer::new_with_indent(sink, b' ', spaces),
        None => Writer::new(sink),
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    if options.indent.is_none() {
        // The indenting writer breaks the line itself
        writer.get_mut().write_all(b"\n")?;
    }
    write_element(&mut writer, root)?;
    writer.get_mut().write_all(b"\n")?;
    writer.get_mut().flush()?;
    Ok(())
}

/// Render `root` as a document into a `String`.
pub fn to_string(root: &XmlElement, options: WriteOptions) -> Result<String> {
    let mut out = Vec::new();
    write_document(root, &mut out, options)?;
    // Everything written above came from `&str` values
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        let value = escape_attribute(&attr.value);
        start.push_attribute(Attribute::from((attr.name.as_bytes(), value.as_bytes())));
    }

    match &element.children {
        XmlChildren::Empty => {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        XmlChildren::Elements(children) => {
            writer.write_event(Event::Start(start))?;
            for child in children {
                write_element(writer, child)?;
            }
        }
        XmlChildren::Text { content, .. } => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Text(BytesText::new(content)))?;
        }
        XmlChildren::Mixed(children) => {
            writer.write_event(Event::Start(start))?;
            for child in children {
                match child {
                    XmlChild::Element(e) => write_element(writer, e)?,
                    XmlChild::Text { content, .. } => {
                        writer.write_event(Event::Text(BytesText::new(content)))?;
                    }
                }
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Escape an attribute value so that a reader's attribute-value
/// normalization gives back exactly `value`.
///
/// Tabs and line breaks become character references; markup characters and
/// quotes get their usual entities.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(['\t', '\n', '\r']) {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len() + 8);
    for ch in escaped.chars() {
        match ch {
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
