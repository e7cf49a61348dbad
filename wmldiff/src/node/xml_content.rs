//! XML content types for tree nodes.

use std::collections::BTreeMap;

/// Represents the content of an XML node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlContent {
    /// An XML element with a qualified name, attributes and namespace
    /// declarations.
    Element(XmlElement),
    /// XML text content.
    Text(XmlText),
}

impl XmlContent {
    /// Returns a reference to the element, if this is an element node.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlContent::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a reference to the text, if this is a text node.
    pub fn as_text(&self) -> Option<&XmlText> {
        match self {
            XmlContent::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// An XML element with a qualified name and attributes.
///
/// Namespace declarations (`xmlns`/`xmlns:p` attributes) are kept apart
/// from ordinary attributes so that comparison and re-emission can treat
/// them as scope context rather than content. Sorted maps give
/// deterministic serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// The qualified name of the element (e.g. "w:p").
    name: String,
    /// Attributes as key-value pairs, excluding namespace declarations.
    attributes: BTreeMap<String, String>,
    /// Namespace declarations on this element (prefix -> URI).
    namespace_decls: BTreeMap<String, String>,
}

impl XmlElement {
    /// Creates a new XML element with the given name and attributes.
    pub fn new(name: String, attributes: BTreeMap<String, String>) -> Self {
        Self::with_namespace_decls(name, attributes, BTreeMap::new())
    }

    /// Creates a new element carrying namespace declarations.
    pub fn with_namespace_decls(
        name: String,
        attributes: BTreeMap<String, String>,
        namespace_decls: BTreeMap<String, String>,
    ) -> Self {
        XmlElement {
            name,
            attributes,
            namespace_decls,
        }
    }

    /// Returns the qualified name of the element.
    pub fn qname(&self) -> &str {
        &self.name
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Returns namespace declarations on this element.
    pub fn namespace_decls(&self) -> &BTreeMap<String, String> {
        &self.namespace_decls
    }
}

impl std::fmt::Display for XmlElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}", self.name)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">")
    }
}

/// XML text content, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlText {
    text: String,
}

impl XmlText {
    /// Creates a new text node from a string.
    pub fn new(text: &str) -> Self {
        XmlText {
            text: text.to_string(),
        }
    }

    /// Returns the text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if the text is entirely whitespace.
    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

impl std::fmt::Display for XmlText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_accessors() {
        let mut attrs = BTreeMap::new();
        attrs.insert("w:val".to_string(), "1".to_string());
        let mut decls = BTreeMap::new();
        decls.insert("w".to_string(), "http://example.com/w".to_string());

        let e = XmlElement::with_namespace_decls("w:p".to_string(), attrs, decls);
        assert_eq!(e.qname(), "w:p");
        assert_eq!(e.attributes().get("w:val"), Some(&"1".to_string()));
        assert_eq!(
            e.namespace_decls().get("w"),
            Some(&"http://example.com/w".to_string())
        );
    }

    #[test]
    fn test_text_whitespace() {
        assert!(XmlText::new("  \n\t").is_whitespace());
        assert!(!XmlText::new("  x ").is_whitespace());
        assert!(XmlText::new("").is_whitespace());
    }

    #[test]
    fn test_content_kind_accessors() {
        let elem = XmlContent::Element(XmlElement::new("p".to_string(), BTreeMap::new()));
        let text = XmlContent::Text(XmlText::new("hello"));

        assert!(elem.as_element().is_some());
        assert!(elem.as_text().is_none());
        assert!(text.as_text().is_some());
        assert!(text.as_element().is_none());
    }
}
