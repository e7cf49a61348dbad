//! Output sink for diff-marked XML.
//!
//! The reconciler and the fine differ route every emitted event through
//! a [`DiffOutput`]. The default [`TrackedChangeFormatter`] writes
//! compact XML where inserted elements carry `dfx:insert="true"`,
//! deleted elements carry `dfx:delete="true"`, and inserted/deleted
//! character runs are wrapped in `ins:ins`/`del:del` spans for the
//! downstream tracked-changes converter.

use std::io::Write;

use rustc_hash::FxHashMap;

use crate::constants::{
    APPROX_ATTR, BASE_PREFIX, DELETE_ATTR, DELETE_TEXT_TAG, INSERT_ATTR, INSERT_TEXT_TAG,
};
use crate::error::Result;
use crate::event::DiffEvent;
use crate::node::PrefixMapping;

/// Sink contract for diff output.
///
/// `declare_prefix_mapping` must be called before emitting content whose
/// namespace bindings are not yet declared in the current output scope,
/// or the emitted tags are unqualified.
pub trait DiffOutput {
    /// Registers the prefix bindings for the next emitted fragment.
    ///
    /// Replaces any bindings registered by an earlier call; a fragment
    /// never inherits a sibling's shadowed prefixes. Bindings already
    /// in scope at the output root are not re-declared.
    fn declare_prefix_mapping(&mut self, bindings: &PrefixMapping) -> Result<()>;

    /// Emits an event present on both sides.
    fn format(&mut self, event: &DiffEvent) -> Result<()>;

    /// Emits an event present only on the right side.
    fn insert(&mut self, event: &DiffEvent) -> Result<()>;

    /// Emits an event present only on the left side.
    fn delete(&mut self, event: &DiffEvent) -> Result<()>;

    /// Marks the start of a span whose diff was not computed exactly.
    fn begin_approximate_span(&mut self) -> Result<()> {
        Ok(())
    }

    /// Ends an approximate span.
    fn end_approximate_span(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Emission category for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Equal,
    Insert,
    Delete,
}

/// Default sink: compact tracked-change XML over any [`Write`].
pub struct TrackedChangeFormatter<W: Write> {
    writer: W,
    /// Bindings declared for the whole output scope (the root wrapper).
    declared: FxHashMap<String, String>,
    /// Bindings of the current fragment, re-declared on its top-level
    /// start tags and dropped when the next fragment is declared.
    fragment_bindings: FxHashMap<String, String>,
    /// Element nesting depth of emitted output.
    depth: usize,
    /// Nesting depth within a delete-marked subtree.
    delete_depth: usize,
    /// Nesting depth within an insert-marked subtree.
    insert_depth: usize,
    /// Whether emitted change marks also carry the approximate flag.
    approximate: bool,
}

impl<W: Write> TrackedChangeFormatter<W> {
    /// Creates a formatter writing to the given sink.
    pub fn new(writer: W) -> Self {
        TrackedChangeFormatter {
            writer,
            declared: FxHashMap::default(),
            fragment_bindings: FxHashMap::default(),
            depth: 0,
            delete_depth: 0,
            insert_depth: 0,
            approximate: false,
        }
    }

    /// Registers a binding already declared by the caller, typically on
    /// the output root wrapper.
    pub fn predeclare(&mut self, prefix: &str, uri: &str) {
        self.declared.insert(prefix.to_string(), uri.to_string());
    }

    fn emit(&mut self, event: &DiffEvent, mark: Mark) -> Result<()> {
        match event {
            DiffEvent::OpenElement {
                qname,
                attributes,
                namespace_decls,
            } => {
                write!(self.writer, "<{}", qname)?;

                // Declarations the element itself carried
                for (prefix, uri) in namespace_decls {
                    write_xmlns(&mut self.writer, prefix, uri)?;
                }
                // Re-declared scope context, only on top-level tags and
                // only where the element or the root did not declare it
                if self.depth == 0 {
                    let mut pairs: Vec<(&String, &String)> =
                        self.fragment_bindings.iter().collect();
                    pairs.sort();
                    for (prefix, uri) in pairs {
                        if namespace_decls.contains_key(prefix.as_str()) {
                            continue;
                        }
                        if self.declared.get(prefix.as_str()) == Some(uri) {
                            continue;
                        }
                        write_xmlns(&mut self.writer, prefix, uri)?;
                    }
                }

                for (name, value) in attributes {
                    write!(self.writer, " {}=\"{}\"", name, escape_attr(value))?;
                }

                match mark {
                    Mark::Delete if self.delete_depth == 0 => {
                        write!(self.writer, " {}:{}=\"true\"", BASE_PREFIX, DELETE_ATTR)?;
                        if self.approximate {
                            write!(self.writer, " {}:{}=\"true\"", BASE_PREFIX, APPROX_ATTR)?;
                        }
                    }
                    Mark::Insert if self.insert_depth == 0 => {
                        write!(self.writer, " {}:{}=\"true\"", BASE_PREFIX, INSERT_ATTR)?;
                        if self.approximate {
                            write!(self.writer, " {}:{}=\"true\"", BASE_PREFIX, APPROX_ATTR)?;
                        }
                    }
                    _ => {}
                }
                write!(self.writer, ">")?;

                self.depth += 1;
                match mark {
                    Mark::Delete => self.delete_depth += 1,
                    Mark::Insert => self.insert_depth += 1,
                    Mark::Equal => {}
                }
            }
            DiffEvent::Text(text) => match mark {
                Mark::Delete if self.delete_depth == 0 => {
                    write!(
                        self.writer,
                        "<{}>{}</{}>",
                        DELETE_TEXT_TAG,
                        escape_text(text),
                        DELETE_TEXT_TAG
                    )?;
                }
                Mark::Insert if self.insert_depth == 0 => {
                    write!(
                        self.writer,
                        "<{}>{}</{}>",
                        INSERT_TEXT_TAG,
                        escape_text(text),
                        INSERT_TEXT_TAG
                    )?;
                }
                _ => {
                    write!(self.writer, "{}", escape_text(text))?;
                }
            },
            DiffEvent::CloseElement { qname } => {
                write!(self.writer, "</{}>", qname)?;
                self.depth = self.depth.saturating_sub(1);
                match mark {
                    Mark::Delete => self.delete_depth = self.delete_depth.saturating_sub(1),
                    Mark::Insert => self.insert_depth = self.insert_depth.saturating_sub(1),
                    Mark::Equal => {}
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> DiffOutput for TrackedChangeFormatter<W> {
    fn declare_prefix_mapping(&mut self, bindings: &PrefixMapping) -> Result<()> {
        self.fragment_bindings.clear();
        for (prefix, uri) in bindings.iter_sorted() {
            if self.declared.get(prefix).map(String::as_str) == Some(uri) {
                continue;
            }
            self.fragment_bindings
                .insert(prefix.to_string(), uri.to_string());
        }
        Ok(())
    }

    fn format(&mut self, event: &DiffEvent) -> Result<()> {
        self.emit(event, Mark::Equal)
    }

    fn insert(&mut self, event: &DiffEvent) -> Result<()> {
        self.emit(event, Mark::Insert)
    }

    fn delete(&mut self, event: &DiffEvent) -> Result<()> {
        self.emit(event, Mark::Delete)
    }

    fn begin_approximate_span(&mut self) -> Result<()> {
        self.approximate = true;
        Ok(())
    }

    fn end_approximate_span(&mut self) -> Result<()> {
        self.approximate = false;
        Ok(())
    }
}

fn write_xmlns<W: Write>(writer: &mut W, prefix: &str, uri: &str) -> std::io::Result<()> {
    if prefix.is_empty() {
        write!(writer, " xmlns=\"{}\"", escape_attr(uri))
    } else {
        write!(writer, " xmlns:{}=\"{}\"", prefix, escape_attr(uri))
    }
}

/// Converts special characters in text content to XML entities.
fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Converts special characters in attribute values to XML entities.
pub(crate) fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}
