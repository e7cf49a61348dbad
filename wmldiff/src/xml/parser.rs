//! XML parser that builds node trees.
//!
//! Uses quick-xml's streaming API. Text is kept verbatim because the
//! fixed diff configuration treats whitespace as significant; namespace
//! declarations are split out of the attribute map so the differ can
//! treat them as scope context instead of content.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::node::{is_xmlns_attr, new_node, NodeInner, NodeRef, XmlContent, XmlElement, XmlText};

/// XML parser that builds node trees.
#[derive(Default)]
pub struct XmlParser;

impl XmlParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        XmlParser
    }

    /// Parses XML from a string.
    ///
    /// Returns a synthetic container node whose first element child is
    /// the document element.
    pub fn parse_str(&self, xml: &str) -> Result<NodeRef> {
        let mut reader = Reader::from_str(xml);
        // Keep text exactly as written, whitespace included
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NodeRef> {
        let file = File::open(path)?;
        let buf_reader = BufReader::new(file);
        let mut reader = Reader::from_reader(buf_reader);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a quick-xml Reader.
    ///
    /// Adjacent text fragments (plain text, entity references, CDATA)
    /// are coalesced into one text node so diff granularity does not
    /// depend on how the source was escaped.
    fn parse_reader<R: Read + std::io::BufRead>(&self, reader: &mut Reader<R>) -> Result<NodeRef> {
        let root = new_node(None);
        let mut node_stack: Vec<NodeRef> = vec![root.clone()];
        let mut pending_text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    flush_text(&node_stack, &mut pending_text);
                    let element = self.parse_element(e, reader)?;
                    let node = new_node(Some(XmlContent::Element(element)));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node.clone());
                    }
                    node_stack.push(node);
                }
                Ok(Event::End(_)) => {
                    flush_text(&node_stack, &mut pending_text);
                    node_stack.pop();
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing tag - handle like Start + End
                    flush_text(&node_stack, &mut pending_text);
                    let element = self.parse_element(e, reader)?;
                    let node = new_node(Some(XmlContent::Element(element)));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                Ok(Event::Text(e)) => {
                    let raw =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    let text = unescape(raw).map_err(|e| Error::Parse(e.to_string()))?;
                    pending_text.push_str(&text);
                }
                Ok(Event::CData(ref e)) => {
                    // Treat CDATA like text
                    pending_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::GeneralRef(ref e)) => {
                    let name = reader
                        .decoder()
                        .decode(e.as_ref())
                        .map_err(|e| Error::Parse(e.to_string()))?;
                    pending_text.push_str(&resolve_general_ref(&name)?);
                }
                Ok(Event::Eof) => {
                    flush_text(&node_stack, &mut pending_text);
                    break;
                }
                Ok(Event::Comment(_))
                | Ok(Event::Decl(_))
                | Ok(Event::PI(_))
                | Ok(Event::DocType(_)) => {
                    // Comments, declarations and PIs carry no compared content
                }
                Err(e) => return Err(Error::Parse(format!("XML parse error: {}", e))),
            }
            buf.clear();
        }

        Ok(root)
    }

    /// Parses an element's name, attributes and namespace declarations.
    fn parse_element<R: Read + std::io::BufRead>(
        &self,
        e: &BytesStart,
        reader: &Reader<R>,
    ) -> Result<XmlElement> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = BTreeMap::new();
        let mut namespace_decls = BTreeMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            if is_xmlns_attr(&key) {
                let prefix = key.strip_prefix("xmlns:").unwrap_or("");
                namespace_decls.insert(prefix.to_string(), value);
            } else {
                attributes.insert(key, value);
            }
        }

        Ok(XmlElement::with_namespace_decls(
            name,
            attributes,
            namespace_decls,
        ))
    }
}

/// Attaches accumulated text as one node under the innermost element.
fn flush_text(node_stack: &[NodeRef], pending_text: &mut String) {
    if pending_text.is_empty() {
        return;
    }
    let node = new_node(Some(XmlContent::Text(XmlText::new(pending_text))));
    if let Some(parent) = node_stack.last() {
        NodeInner::add_child_to_ref(parent, node);
    }
    pending_text.clear();
}

/// Resolves a general entity reference to its replacement text.
///
/// Only the five predefined XML entities and numeric character
/// references are supported; DTD-defined entities are not.
fn resolve_general_ref(name: &str) -> Result<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = if let Some(hex) = code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            u32::from_str_radix(hex, 16)
        } else {
            code.parse::<u32>()
        }
        .map_err(|_| Error::Parse(format!("invalid character reference &#{};", code)))?;
        let c = char::from_u32(value)
            .ok_or_else(|| Error::Parse(format!("invalid character reference &#{};", code)))?;
        return Ok(c.to_string());
    }
    match name {
        "amp" => Ok("&".to_string()),
        "lt" => Ok("<".to_string()),
        "gt" => Ok(">".to_string()),
        "apos" => Ok("'".to_string()),
        "quot" => Ok("\"".to_string()),
        _ => Err(Error::Parse(format!("unknown entity reference &{};", name))),
    }
}

/// Parses XML from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<NodeRef> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string.
pub fn parse_str(xml: &str) -> Result<NodeRef> {
    XmlParser::new().parse_str(xml)
}

/// Returns the document element of a parsed tree: the first element
/// child of the synthetic container node.
pub fn document_element(root: &NodeRef) -> Option<NodeRef> {
    root.borrow()
        .children()
        .iter()
        .find(|c| c.borrow().is_element())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let root = parse_str(r#"<root><child>text</child></root>"#).unwrap();

        let doc = document_element(&root).unwrap();
        let doc_borrowed = doc.borrow();
        let elem = doc_borrowed.content().unwrap().as_element().unwrap();
        assert_eq!(elem.qname(), "root");
        assert_eq!(doc_borrowed.child_count(), 1);

        let child = doc_borrowed.children()[0].clone();
        let child_borrowed = child.borrow();
        assert_eq!(
            child_borrowed.content().unwrap().as_element().unwrap().qname(),
            "child"
        );
        let text = child_borrowed.children()[0].clone();
        assert_eq!(
            text.borrow().content().unwrap().as_text().unwrap().text(),
            "text"
        );
    }

    #[test]
    fn test_parse_namespace_decls_split_from_attrs() {
        let root = parse_str(
            r#"<w:body xmlns:w="http://example.com/w" w:rsid="00A1"><w:p /></w:body>"#,
        )
        .unwrap();

        let doc = document_element(&root).unwrap();
        let doc_borrowed = doc.borrow();
        let elem = doc_borrowed.content().unwrap().as_element().unwrap();

        assert_eq!(elem.qname(), "w:body");
        assert_eq!(elem.attributes().get("w:rsid"), Some(&"00A1".to_string()));
        assert!(elem.attributes().get("xmlns:w").is_none());
        assert_eq!(
            elem.namespace_decls().get("w"),
            Some(&"http://example.com/w".to_string())
        );
    }

    #[test]
    fn test_parse_default_namespace() {
        let root = parse_str(r#"<body xmlns="http://example.com/d" />"#).unwrap();
        let doc = document_element(&root).unwrap();
        let doc_borrowed = doc.borrow();
        let elem = doc_borrowed.content().unwrap().as_element().unwrap();
        assert_eq!(
            elem.namespace_decls().get(""),
            Some(&"http://example.com/d".to_string())
        );
    }

    #[test]
    fn test_text_kept_verbatim() {
        let root = parse_str("<root>  two  spaces  </root>").unwrap();
        let doc = document_element(&root).unwrap();
        let doc_borrowed = doc.borrow();
        let text = doc_borrowed.children()[0].clone();
        assert_eq!(
            text.borrow().content().unwrap().as_text().unwrap().text(),
            "  two  spaces  "
        );
    }

    #[test]
    fn test_entities_unescaped() {
        let root = parse_str("<root>a &amp; b &lt;c&gt;</root>").unwrap();
        let doc = document_element(&root).unwrap();
        let doc_borrowed = doc.borrow();
        let text = doc_borrowed.children()[0].clone();
        assert_eq!(
            text.borrow().content().unwrap().as_text().unwrap().text(),
            "a & b <c>"
        );
    }

    #[test]
    fn test_malformed_input_is_error() {
        assert!(parse_str("<root><unclosed></root>").is_err());
    }
}
