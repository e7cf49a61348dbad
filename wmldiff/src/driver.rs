//! Divide-and-conquer diff driver.
//!
//! Diffing two large word-processing documents event-by-event does not
//! scale, so the driver splits the problem: the top-level children of
//! the compared roots become opaque atoms, a coarse matcher finds the
//! runs of atoms that differ, and only those runs are handed to the
//! fine differ. Unchanged atoms are streamed through verbatim. When the
//! roots are incompatible or too small to be worth splitting, the whole
//! trees go to the fine differ directly.

use std::io::Write;

use tracing::debug;

use crate::atom::{build_atoms, DiffAtom};
use crate::config::DiffConfig;
use crate::constants::{
    BASE_NS, BASE_PREFIX, BYPASS_MAX_CHILDREN, DELETE_NS, DELETE_PREFIX, INSERT_NS, INSERT_PREFIX,
};
use crate::differ::{emit_sequence, EventDiffer, TreeEventDiffer};
use crate::error::{Error, Result};
use crate::event::{DomRecorder, EventSequence};
use crate::format::{escape_attr, DiffOutput, TrackedChangeFormatter};
use crate::matcher::{MyersRangeMatcher, RangeDifference, RangeKind, RangeMatcher};
use crate::node::{bindings_in_scope, split_qname, NodeRef, PrefixMapping, XmlContent};

/// Top-level document differ.
///
/// Owns the configuration and the two pluggable stages. The default
/// stages are [`MyersRangeMatcher`] and [`TreeEventDiffer`]; either can
/// be replaced through [`DocDiffer::with_parts`].
pub struct DocDiffer {
    config: DiffConfig,
    matcher: Box<dyn RangeMatcher>,
    differ: Box<dyn EventDiffer>,
}

impl Default for DocDiffer {
    fn default() -> Self {
        DocDiffer {
            config: DiffConfig::default(),
            matcher: Box::new(MyersRangeMatcher::new()),
            differ: Box::new(TreeEventDiffer::new()),
        }
    }
}

impl DocDiffer {
    /// Creates a differ with the default configuration and stages.
    pub fn new() -> Self {
        DocDiffer::default()
    }

    /// Creates a differ with the given configuration and default stages.
    pub fn with_config(config: DiffConfig) -> Result<Self> {
        config.validate()?;
        Ok(DocDiffer {
            config,
            ..DocDiffer::default()
        })
    }

    /// Creates a differ with custom matching and fine-diff stages.
    pub fn with_parts(
        config: DiffConfig,
        matcher: Box<dyn RangeMatcher>,
        differ: Box<dyn EventDiffer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(DocDiffer {
            config,
            matcher,
            differ,
        })
    }

    /// Diffs two document roots and writes marked-up XML to the sink.
    ///
    /// Both roots must be element nodes. When their names differ, or
    /// when both carry at most [`BYPASS_MAX_CHILDREN`] element children,
    /// the whole trees are compared directly and no wrapper is written.
    /// Only element children count toward the threshold, so the
    /// divide-vs-bypass decision is the same for compact and
    /// pretty-printed renditions of one document.
    /// Otherwise the output is the left root's start tag carrying the
    /// diff namespace declarations, the reconciled child fragments, and
    /// the matching end tag.
    pub fn diff<W: Write>(&self, left: &NodeRef, right: &NodeRef, mut writer: W) -> Result<()> {
        let left_name = element_qname(left)?;
        let right_name = element_qname(right)?;
        let recorder = DomRecorder::new(self.config.clone());

        let left_children = element_child_count(left);
        let right_children = element_child_count(right);
        if left_name != right_name
            || (left_children <= BYPASS_MAX_CHILDREN && right_children <= BYPASS_MAX_CHILDREN)
        {
            debug!(
                %left_name,
                %right_name,
                left_children,
                right_children,
                "bypassing division, diffing whole trees"
            );
            let left_seq = recorder.process(left)?;
            let right_seq = recorder.process(right)?;

            let mut bindings = marker_bindings();
            bindings.merge(left_seq.prefix_mapping());
            bindings.merge(right_seq.prefix_mapping());

            let mut out = TrackedChangeFormatter::new(writer);
            out.declare_prefix_mapping(&bindings)?;
            return self.differ.diff(&left_seq, &right_seq, &mut out, &self.config);
        }

        let left_atoms = build_atoms(left, &recorder)?;
        let right_atoms = build_atoms(right, &recorder)?;
        let ranges = self.matcher.find_differences(&left_atoms, &right_atoms)?;
        debug!(
            left_atoms = left_atoms.len(),
            right_atoms = right_atoms.len(),
            changed_ranges = ranges.len(),
            "divided documents"
        );

        let scope = bindings_in_scope(left);
        write_wrapper_open(&mut writer, &left_name, &scope)?;
        {
            let mut out = TrackedChangeFormatter::new(&mut writer);
            out.predeclare(BASE_PREFIX, BASE_NS);
            out.predeclare(DELETE_PREFIX, DELETE_NS);
            out.predeclare(INSERT_PREFIX, INSERT_NS);
            match split_qname(&left_name) {
                (Some(prefix), _) => {
                    if let Some(uri) = scope.get(prefix) {
                        out.predeclare(prefix, uri);
                    }
                }
                (None, _) => {
                    if let Some(uri) = scope.get("") {
                        out.predeclare("", uri);
                    }
                }
            }
            self.reconcile(&left_atoms, &right_atoms, &ranges, &mut out)?;
        }
        write!(writer, "</{}>", left_name)?;
        Ok(())
    }

    /// Walks the change ranges with a cursor over the left atoms,
    /// streaming equal gaps verbatim and fine-diffing changed runs.
    ///
    /// Every left atom is consumed exactly once: as part of a gap, a
    /// range body, or the tail after the last range.
    fn reconcile(
        &self,
        left: &[DiffAtom],
        right: &[DiffAtom],
        ranges: &[RangeDifference],
        out: &mut dyn DiffOutput,
    ) -> Result<()> {
        let mut cursor = 0;
        for range in ranges {
            for atom in &left[cursor..range.left_start] {
                out.declare_prefix_mapping(atom.prefix_mapping())?;
                emit_sequence(atom.seq(), out, None)?;
            }

            match range.kind {
                RangeKind::Equal => {
                    // A conforming matcher reports only changed runs,
                    // but an equal run is still handled correctly.
                    for atom in &left[range.left_start..range.left_end()] {
                        out.declare_prefix_mapping(atom.prefix_mapping())?;
                        emit_sequence(atom.seq(), out, None)?;
                    }
                }
                RangeKind::Change => {
                    let left_run = composite(&left[range.left_start..range.left_end()]);
                    let right_run = composite(&right[range.right_start..range.right_end()]);
                    // One declaration for the whole run, since both
                    // sides' content is emitted into the same fragment
                    let mut bindings = left_run.prefix_mapping().clone();
                    bindings.merge(right_run.prefix_mapping());
                    out.declare_prefix_mapping(&bindings)?;

                    let combined = left_run.len() + right_run.len();
                    if combined > self.config.max_fine_events {
                        debug!(
                            events = combined,
                            cap = self.config.max_fine_events,
                            "event cap exceeded, degrading range to whole-run replace"
                        );
                        out.begin_approximate_span()?;
                        emit_sequence(&left_run, out, Some(false))?;
                        emit_sequence(&right_run, out, Some(true))?;
                        out.end_approximate_span()?;
                    } else {
                        self.differ.diff(&left_run, &right_run, out, &self.config)?;
                    }
                }
            }
            cursor = range.left_end();
        }

        for atom in &left[cursor..] {
            out.declare_prefix_mapping(atom.prefix_mapping())?;
            emit_sequence(atom.seq(), out, None)?;
        }
        Ok(())
    }
}

/// Concatenates a run of atoms into one comparison sequence.
fn composite(atoms: &[DiffAtom]) -> EventSequence {
    let mut seq = EventSequence::new();
    for atom in atoms {
        seq.add_sequence(atom.seq());
    }
    seq
}

/// The namespace bindings carried by the diff markup itself.
fn marker_bindings() -> PrefixMapping {
    let mut bindings = PrefixMapping::new();
    bindings.bind(BASE_PREFIX, BASE_NS);
    bindings.bind(DELETE_PREFIX, DELETE_NS);
    bindings.bind(INSERT_PREFIX, INSERT_NS);
    bindings
}

fn element_qname(node: &NodeRef) -> Result<String> {
    let borrowed = node.borrow();
    match borrowed.content().and_then(XmlContent::as_element) {
        Some(e) => Ok(e.qname().to_string()),
        None => Err(Error::Comparison(
            "compared root must be an element".to_string(),
        )),
    }
}

fn element_child_count(node: &NodeRef) -> usize {
    node.borrow()
        .children()
        .iter()
        .filter(|child| child.borrow().is_element())
        .count()
}

/// Writes the output root start tag: the left root's name, its own
/// namespace binding when one is in scope, and the three diff bindings.
fn write_wrapper_open<W: Write>(
    writer: &mut W,
    qname: &str,
    scope: &PrefixMapping,
) -> Result<()> {
    write!(writer, "<{}", qname)?;
    match split_qname(qname) {
        (Some(prefix), _) => {
            if let Some(uri) = scope.get(prefix) {
                write!(writer, " xmlns:{}=\"{}\"", prefix, escape_attr(uri))?;
            }
        }
        (None, _) => {
            if let Some(uri) = scope.get("") {
                write!(writer, " xmlns=\"{}\"", escape_attr(uri))?;
            }
        }
    }
    write!(writer, " xmlns:{}=\"{}\"", BASE_PREFIX, BASE_NS)?;
    write!(writer, " xmlns:{}=\"{}\"", DELETE_PREFIX, DELETE_NS)?;
    write!(writer, " xmlns:{}=\"{}\"", INSERT_PREFIX, INSERT_NS)?;
    write!(writer, ">")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{document_element, parse_str};

    fn diff_to_string(left_xml: &str, right_xml: &str) -> String {
        diff_with(DocDiffer::new(), left_xml, right_xml)
    }

    fn diff_with(differ: DocDiffer, left_xml: &str, right_xml: &str) -> String {
        let left = document_element(&parse_str(left_xml).unwrap()).unwrap();
        let right = document_element(&parse_str(right_xml).unwrap()).unwrap();
        let mut out = Vec::new();
        differ.diff(&left, &right, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    const DECLS: &str = "xmlns:dfx=\"https://www.topologi.com/2005/Diff-X\" \
         xmlns:del=\"https://www.topologi.com/2005/Diff-X/Delete\" \
         xmlns:ins=\"https://www.topologi.com/2005/Diff-X\"";

    #[test]
    fn test_small_documents_bypass_division() {
        let output = diff_to_string("<body><p>A</p></body>", "<body><p>B</p></body>");
        // No wrapper; the compared roots carry the marker bindings
        assert_eq!(
            output,
            "<body xmlns:del=\"https://www.topologi.com/2005/Diff-X/Delete\" \
             xmlns:dfx=\"https://www.topologi.com/2005/Diff-X\" \
             xmlns:ins=\"https://www.topologi.com/2005/Diff-X\">\
             <p><del:del>A</del:del><ins:ins>B</ins:ins></p></body>"
        );
    }

    #[test]
    fn test_gate_ignores_formatting_whitespace() {
        let left = "<body>\n  <p>A</p>\n  <p>B</p>\n</body>";
        let right = "<body>\n  <p>A</p>\n  <p>X</p>\n</body>";
        let output = diff_to_string(left, right);
        // Two element children: bypassed regardless of text children,
        // and the inter-block whitespace survives
        assert!(output.contains(">\n  <p>A</p>"));
        assert!(output.contains("<p><del:del>B</del:del><ins:ins>X</ins:ins></p>"));
    }

    #[test]
    fn test_mismatched_roots_bypass_division() {
        let output = diff_to_string(
            "<a><p>1</p><p>2</p><p>3</p><p>4</p></a>",
            "<b><p>1</p><p>2</p><p>3</p><p>4</p></b>",
        );
        assert!(output.contains("<a"));
        assert!(output.contains("dfx:delete=\"true\""));
        assert!(output.contains("dfx:insert=\"true\""));
        assert!(!output.contains("</a><a"));
    }

    #[test]
    fn test_divided_diff_wraps_and_marks_only_the_change() {
        let output = diff_to_string(
            "<body><p>A</p><p>B</p><p>C</p><p>D</p></body>",
            "<body><p>A</p><p>X</p><p>C</p><p>D</p></body>",
        );
        assert_eq!(
            output,
            format!(
                "<body {}><p>A</p><p><del:del>B</del:del><ins:ins>X</ins:ins></p>\
                 <p>C</p><p>D</p></body>",
                DECLS
            )
        );
    }

    #[test]
    fn test_insertion_between_unchanged_atoms() {
        let output = diff_to_string(
            "<body><p>A</p><p>B</p><p>C</p><p>D</p></body>",
            "<body><p>A</p><p>B</p><p>N</p><p>C</p><p>D</p></body>",
        );
        assert_eq!(
            output,
            format!(
                "<body {}><p>A</p><p>B</p><p dfx:insert=\"true\">N</p><p>C</p><p>D</p></body>",
                DECLS
            )
        );
    }

    #[test]
    fn test_identical_documents_stream_through_unmarked() {
        let doc = "<body><p>A</p><p>B</p><p>C</p><p>D</p></body>";
        let output = diff_to_string(doc, doc);
        assert_eq!(
            output,
            format!("<body {}><p>A</p><p>B</p><p>C</p><p>D</p></body>", DECLS)
        );
    }

    #[test]
    fn test_cap_exceeded_degrades_range() {
        let differ = DocDiffer::with_config(DiffConfig {
            max_fine_events: 1,
            ..DiffConfig::default()
        })
        .unwrap();
        let output = diff_with(
            differ,
            "<body><p>A</p><p>B</p><p>C</p><p>D</p></body>",
            "<body><p>A</p><p>X</p><p>C</p><p>D</p></body>",
        );
        assert_eq!(
            output,
            format!(
                "<body {}><p>A</p>\
                 <p dfx:delete=\"true\" dfx:approx=\"true\">B</p>\
                 <p dfx:insert=\"true\" dfx:approx=\"true\">X</p>\
                 <p>C</p><p>D</p></body>",
                DECLS
            )
        );
    }

    #[test]
    fn test_wrapper_reuses_root_namespace_binding() {
        let output = diff_to_string(
            r#"<w:body xmlns:w="http://w"><w:p>A</w:p><w:p>B</w:p><w:p>C</w:p><w:p>D</w:p></w:body>"#,
            r#"<w:body xmlns:w="http://w"><w:p>A</w:p><w:p>X</w:p><w:p>C</w:p><w:p>D</w:p></w:body>"#,
        );
        assert!(output.starts_with("<w:body xmlns:w=\"http://w\" xmlns:dfx="));
        // The predeclared binding is not repeated on the fragments
        assert_eq!(output.matches("xmlns:w=").count(), 1);
        assert!(output.contains("<w:p><del:del>B</del:del><ins:ins>X</ins:ins></w:p>"));
        assert!(output.ends_with("</w:body>"));
    }

    #[test]
    fn test_shadowed_prefix_stays_on_its_own_atom() {
        let doc = concat!(
            r#"<w:body xmlns:w="http://one">"#,
            r#"<w:p xmlns:w="http://two">a</w:p>"#,
            "<w:p>b</w:p><w:p>c</w:p><w:p>d</w:p>",
            "</w:body>"
        );
        let output = diff_to_string(doc, doc);
        assert!(output.contains("<w:p xmlns:w=\"http://two\">a</w:p>"));
        assert!(output.contains("<w:p>b</w:p>"));
        assert!(output.contains("<w:p>c</w:p>"));
        // Siblings bound to the root's URI never inherit the shadow
        assert_eq!(output.matches("http://two").count(), 1);
        assert!(!output.contains("dfx:insert"));
        assert!(!output.contains("dfx:delete"));
    }

    #[test]
    fn test_non_element_root_is_comparison_error() {
        let container = parse_str("<p>x</p>").unwrap();
        let doc = document_element(&container).unwrap();
        let mut out = Vec::new();
        // The synthetic container node is not an element
        let result = DocDiffer::new().diff(&container, &doc, &mut out);
        assert!(matches!(result, Err(Error::Comparison(_))));
    }
}
