//! Source-tracked XML trees for compat config fragments.
//!
//! This crate wraps [`quick-xml`] to provide a tree of [`XmlElement`]s where
//! each element and attribute remembers its byte span in the original source,
//! and to write such trees back out as documents.
//!
//! # Overview
//!
//! The main types are:
//! - [`XmlDocument`]: a parsed document, able to map spans to line numbers
//! - [`XmlElement`]: an element with qualified name, ordered attributes and children
//! - [`XmlAttribute`]: an attribute with its unescaped value
//! - [`XmlChildren`]: element content (elements, text, mixed, or empty)
//!
//! # Example
//!
//! ```rust
//! use compat_xml::{WriteOptions, parse, to_string};
//!
//! let doc = parse(r#"<config>
//!   <compat-change id="1234" name="TEST_CHANGE"/>
//! </config>"#).unwrap();
//!
//! let change = doc.root.all_children()[0];
//! assert_eq!(change.get_attribute("name"), Some("TEST_CHANGE"));
//! assert_eq!(doc.line_of(change.span), 2);
//!
//! let out = to_string(&doc.root, WriteOptions::compact()).unwrap();
//! assert!(out.contains(r#"<config><compat-change id="1234" name="TEST_CHANGE"/></config>"#));
//! ```

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use parser::{parse, parse_bytes};
pub use types::{
    Location, SourceSpan, XmlAttribute, XmlChild, XmlChildren, XmlDocument, XmlElement,
};
pub use writer::{WriteOptions, to_string, write_document};
