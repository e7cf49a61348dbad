//! Fine-grained event-sequence differ.
//!
//! The differ is a capability behind the [`EventDiffer`] trait so a
//! conforming alternative (a different LCS variant, for instance) can be
//! substituted without touching the reconciler. The default
//! implementation rebuilds the node forests the sequences were recorded
//! from and diffs child lists by subtree identity, recursing into
//! replaced element pairs that share a name and attributes. Keeping the
//! recursion at element granularity means open and close events are
//! never split across change categories, so the output is well-formed
//! by construction.

use similar::DiffOp;
use tracing::debug;

use crate::config::DiffConfig;
use crate::error::Result;
use crate::event::{subtree_hash, DiffEvent, EventSequence};
use crate::format::DiffOutput;
use crate::matcher::myers_diff_ops;
use crate::node::{NodeRef, XmlContent};

/// Capability contract for the fine diff stage.
///
/// Writes equal/insert/delete-formatted events to the sink honoring the
/// configuration. Malformed or incomparable input raises a comparison
/// error; failures are fatal and never retried.
pub trait EventDiffer {
    /// Diffs two event sequences into the sink.
    fn diff(
        &self,
        left: &EventSequence,
        right: &EventSequence,
        out: &mut dyn DiffOutput,
        config: &DiffConfig,
    ) -> Result<()>;
}

/// Emission category for a whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitAs {
    Equal,
    Insert,
    Delete,
}

/// Default fine differ: recursive child-list diff by subtree identity.
#[derive(Debug, Default)]
pub struct TreeEventDiffer;

impl TreeEventDiffer {
    /// Creates the default fine differ.
    pub fn new() -> Self {
        TreeEventDiffer
    }

    fn diff_forest(
        &self,
        left: &[NodeRef],
        right: &[NodeRef],
        out: &mut dyn DiffOutput,
    ) -> Result<()> {
        let left_ids: Vec<u64> = left.iter().map(subtree_hash).collect();
        let right_ids: Vec<u64> = right.iter().map(subtree_hash).collect();

        for op in myers_diff_ops(&left_ids, &right_ids) {
            match op {
                DiffOp::Equal { old_index, len, .. } => {
                    for node in &left[old_index..old_index + len] {
                        emit_subtree(node, out, EmitAs::Equal)?;
                    }
                }
                DiffOp::Delete {
                    old_index, old_len, ..
                } => {
                    for node in &left[old_index..old_index + old_len] {
                        emit_subtree(node, out, EmitAs::Delete)?;
                    }
                }
                DiffOp::Insert {
                    new_index, new_len, ..
                } => {
                    for node in &right[new_index..new_index + new_len] {
                        emit_subtree(node, out, EmitAs::Insert)?;
                    }
                }
                DiffOp::Replace {
                    old_index,
                    old_len,
                    new_index,
                    new_len,
                } => {
                    let old = &left[old_index..old_index + old_len];
                    let new = &right[new_index..new_index + new_len];
                    let paired = old_len.min(new_len);

                    for i in 0..paired {
                        self.diff_pair(&old[i], &new[i], out)?;
                    }
                    for node in &old[paired..] {
                        emit_subtree(node, out, EmitAs::Delete)?;
                    }
                    for node in &new[paired..] {
                        emit_subtree(node, out, EmitAs::Insert)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Diffs one positionally paired replacement.
    ///
    /// Element pairs with identical names and attributes share their
    /// tags and recurse into the children; everything else becomes a
    /// whole-subtree delete plus insert.
    fn diff_pair(&self, left: &NodeRef, right: &NodeRef, out: &mut dyn DiffOutput) -> Result<()> {
        let shared = {
            let lb = left.borrow();
            let rb = right.borrow();
            match (lb.content(), rb.content()) {
                (Some(XmlContent::Element(le)), Some(XmlContent::Element(re)))
                    if le.qname() == re.qname()
                        && le.attributes() == re.attributes()
                        && le.namespace_decls() == re.namespace_decls() =>
                {
                    Some((
                        DiffEvent::OpenElement {
                            qname: le.qname().to_string(),
                            attributes: le.attributes().clone(),
                            namespace_decls: le.namespace_decls().clone(),
                        },
                        DiffEvent::CloseElement {
                            qname: le.qname().to_string(),
                        },
                        lb.children().to_vec(),
                        rb.children().to_vec(),
                    ))
                }
                _ => None,
            }
        };

        match shared {
            Some((open, close, left_children, right_children)) => {
                out.format(&open)?;
                self.diff_forest(&left_children, &right_children, out)?;
                out.format(&close)?;
            }
            None => {
                emit_subtree(left, out, EmitAs::Delete)?;
                emit_subtree(right, out, EmitAs::Insert)?;
            }
        }
        Ok(())
    }
}

impl EventDiffer for TreeEventDiffer {
    fn diff(
        &self,
        left: &EventSequence,
        right: &EventSequence,
        out: &mut dyn DiffOutput,
        _config: &DiffConfig,
    ) -> Result<()> {
        debug!(
            left_events = left.len(),
            right_events = right.len(),
            "fine diff"
        );
        let left_forest = left.to_forest()?;
        let right_forest = right.to_forest()?;
        self.diff_forest(&left_forest, &right_forest, out)
    }
}

/// Emits a whole subtree through the sink under one category.
fn emit_subtree(node: &NodeRef, out: &mut dyn DiffOutput, category: EmitAs) -> Result<()> {
    let put = |out: &mut dyn DiffOutput, event: &DiffEvent| match category {
        EmitAs::Equal => out.format(event),
        EmitAs::Insert => out.insert(event),
        EmitAs::Delete => out.delete(event),
    };

    let borrowed = node.borrow();
    match borrowed.content() {
        Some(XmlContent::Element(e)) => {
            put(
                out,
                &DiffEvent::OpenElement {
                    qname: e.qname().to_string(),
                    attributes: e.attributes().clone(),
                    namespace_decls: e.namespace_decls().clone(),
                },
            )?;
            let qname = e.qname().to_string();
            for child in borrowed.children() {
                emit_subtree(child, out, category)?;
            }
            put(out, &DiffEvent::CloseElement { qname })?;
        }
        Some(XmlContent::Text(t)) => {
            put(out, &DiffEvent::Text(t.text().to_string()))?;
        }
        None => {
            for child in borrowed.children() {
                emit_subtree(child, out, category)?;
            }
        }
    }
    Ok(())
}

/// Emits every event of a sequence through the sink under one category.
/// Used by the reconciler for verbatim and degraded-range emission.
pub(crate) fn emit_sequence(
    seq: &EventSequence,
    out: &mut dyn DiffOutput,
    insert: Option<bool>,
) -> Result<()> {
    for event in seq.events() {
        match insert {
            None => out.format(event)?,
            Some(true) => out.insert(event)?,
            Some(false) => out.delete(event)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TrackedChangeFormatter;
    use crate::xml::{document_element, parse_str};
    use crate::event::DomRecorder;

    fn record(xml: &str) -> EventSequence {
        let root = parse_str(xml).unwrap();
        let doc = document_element(&root).unwrap();
        DomRecorder::new(DiffConfig::default()).process(&doc).unwrap()
    }

    fn diff_to_string(left_xml: &str, right_xml: &str) -> String {
        let left = record(left_xml);
        let right = record(right_xml);
        let mut out = Vec::new();
        let mut formatter = TrackedChangeFormatter::new(&mut out);
        TreeEventDiffer::new()
            .diff(&left, &right, &mut formatter, &DiffConfig::default())
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_identical_sequences_emit_no_marks() {
        let output = diff_to_string("<p><b>x</b>y</p>", "<p><b>x</b>y</p>");
        assert_eq!(output, "<p><b>x</b>y</p>");
    }

    #[test]
    fn test_changed_text_within_shared_element() {
        let output = diff_to_string("<p>B</p>", "<p>X</p>");
        assert_eq!(output, "<p><del:del>B</del:del><ins:ins>X</ins:ins></p>");
    }

    #[test]
    fn test_renamed_element_replaced_wholesale() {
        let output = diff_to_string("<p>x</p>", "<q>x</q>");
        assert_eq!(
            output,
            "<p dfx:delete=\"true\">x</p><q dfx:insert=\"true\">x</q>"
        );
    }

    #[test]
    fn test_changed_attributes_replace_subtree() {
        let output = diff_to_string(r#"<p id="1">x</p>"#, r#"<p id="2">x</p>"#);
        assert_eq!(
            output,
            "<p id=\"1\" dfx:delete=\"true\">x</p><p id=\"2\" dfx:insert=\"true\">x</p>"
        );
    }

    #[test]
    fn test_deep_change_recurses_to_text() {
        let output = diff_to_string(
            "<p><r><t>old words</t></r></p>",
            "<p><r><t>new words</t></r></p>",
        );
        assert_eq!(
            output,
            "<p><r><t><del:del>old words</del:del><ins:ins>new words</ins:ins></t></r></p>"
        );
    }

    #[test]
    fn test_appended_child_insert_marked() {
        let output = diff_to_string("<p><b>x</b></p>", "<p><b>x</b><b>y</b></p>");
        assert_eq!(output, "<p><b>x</b><b dfx:insert=\"true\">y</b></p>");
    }

    #[test]
    fn test_removed_child_delete_marked() {
        let output = diff_to_string("<p><b>x</b><b>y</b></p>", "<p><b>x</b></p>");
        assert_eq!(output, "<p><b>x</b><b dfx:delete=\"true\">y</b></p>");
    }

    #[test]
    fn test_empty_left_sequence_all_inserted() {
        let left = EventSequence::new();
        let right = record("<p>new</p>");
        let mut out = Vec::new();
        let mut formatter = TrackedChangeFormatter::new(&mut out);
        TreeEventDiffer::new()
            .diff(&left, &right, &mut formatter, &DiffConfig::default())
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<p dfx:insert=\"true\">new</p>"
        );
    }

    #[test]
    fn test_unbalanced_sequence_is_comparison_error() {
        let mut bad = EventSequence::new();
        bad.push(DiffEvent::CloseElement {
            qname: "p".to_string(),
        });
        let right = record("<p>x</p>");
        let mut out = Vec::new();
        let mut formatter = TrackedChangeFormatter::new(&mut out);
        let result = TreeEventDiffer::new().diff(&bad, &right, &mut formatter, &DiffConfig::default());
        assert!(result.is_err());
    }
}
