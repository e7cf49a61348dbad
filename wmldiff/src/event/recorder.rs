//! Content recorder: turns an element subtree into an event sequence.

use crate::config::DiffConfig;
use crate::error::{Error, Result};
use crate::node::{NodeRef, XmlContent};

use super::{DiffEvent, EventSequence};

/// Records the event representation and prefix bindings of a subtree.
///
/// `process` implements the recorder contract consumed by the atom
/// builder and the bypass path: one call produces one owned, immutable
/// [`EventSequence`] carrying the namespace declarations encountered in
/// the subtree.
pub struct DomRecorder {
    config: DiffConfig,
}

impl DomRecorder {
    /// Creates a recorder with the given configuration.
    pub fn new(config: DiffConfig) -> Self {
        DomRecorder { config }
    }

    /// Records an element node and its subtree into an event sequence.
    pub fn process(&self, node: &NodeRef) -> Result<EventSequence> {
        if !node.borrow().is_element() {
            return Err(Error::Comparison(
                "recorder input must be an element node".to_string(),
            ));
        }
        let mut seq = EventSequence::new();
        self.record_node(node, &mut seq);
        Ok(seq)
    }

    fn record_node(&self, node: &NodeRef, seq: &mut EventSequence) {
        let borrowed = node.borrow();
        match borrowed.content() {
            Some(XmlContent::Element(e)) => {
                for (prefix, uri) in e.namespace_decls() {
                    seq.prefix_mapping_mut().bind_if_absent(prefix, uri);
                }
                seq.push(DiffEvent::OpenElement {
                    qname: e.qname().to_string(),
                    attributes: e.attributes().clone(),
                    namespace_decls: e.namespace_decls().clone(),
                });
                let qname = e.qname().to_string();
                for child in borrowed.children() {
                    self.record_node(child, seq);
                }
                seq.push(DiffEvent::CloseElement { qname });
            }
            Some(XmlContent::Text(t)) => {
                if self.config.preserve_whitespace || !t.is_whitespace() {
                    seq.push(DiffEvent::Text(t.text().to_string()));
                }
            }
            None => {
                for child in borrowed.children() {
                    self.record_node(child, seq);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{document_element, parse_str};

    fn doc(xml: &str) -> NodeRef {
        document_element(&parse_str(xml).unwrap()).unwrap()
    }

    #[test]
    fn test_record_simple_subtree() {
        let recorder = DomRecorder::new(DiffConfig::default());
        let seq = recorder.process(&doc("<p>hi</p>")).unwrap();

        assert_eq!(seq.len(), 3);
        assert!(matches!(seq.events()[0], DiffEvent::OpenElement { .. }));
        assert!(matches!(seq.events()[1], DiffEvent::Text(ref t) if t == "hi"));
        assert!(matches!(seq.events()[2], DiffEvent::CloseElement { .. }));
    }

    #[test]
    fn test_namespace_decls_collected_into_mapping() {
        let recorder = DomRecorder::new(DiffConfig::default());
        let seq = recorder
            .process(&doc(r#"<w:p xmlns:w="http://w"><w:r xmlns:r="http://r" /></w:p>"#))
            .unwrap();

        assert_eq!(seq.prefix_mapping().get("w"), Some("http://w"));
        assert_eq!(seq.prefix_mapping().get("r"), Some("http://r"));
    }

    #[test]
    fn test_whitespace_preserved_under_default_config() {
        let recorder = DomRecorder::new(DiffConfig::default());
        let seq = recorder.process(&doc("<p> <b>x</b> </p>")).unwrap();

        let text_events = seq
            .events()
            .iter()
            .filter(|e| matches!(e, DiffEvent::Text(_)))
            .count();
        assert_eq!(text_events, 3);
    }

    #[test]
    fn test_whitespace_dropped_when_not_preserved() {
        let config = DiffConfig {
            preserve_whitespace: false,
            ..DiffConfig::default()
        };
        let recorder = DomRecorder::new(config);
        let seq = recorder.process(&doc("<p> <b>x</b> </p>")).unwrap();

        let text_events = seq
            .events()
            .iter()
            .filter(|e| matches!(e, DiffEvent::Text(_)))
            .count();
        assert_eq!(text_events, 1);
    }

    #[test]
    fn test_text_input_rejected() {
        let recorder = DomRecorder::new(DiffConfig::default());
        let root = parse_str("<p>hi</p>").unwrap();
        let p = document_element(&root).unwrap();
        let text = p.borrow().children()[0].clone();
        assert!(recorder.process(&text).is_err());
    }
}
