//! Atom extraction: top-level children as opaque comparison units.
//!
//! Each direct element child of a compared root becomes one [`DiffAtom`]
//! carrying its recorded event representation, a content-derived
//! identity, and the namespace bindings in scope at that child. Text
//! children at this level are treated as formatting whitespace and
//! skipped; meaningful text as a direct sibling of elements is therefore
//! not compared. This is a known limitation of the approach.

use crate::error::Result;
use crate::event::{DomRecorder, EventSequence};
use crate::node::{bindings_in_scope, NodeRef, PrefixMapping};

/// One top-level child element, on one side of the comparison.
///
/// Created once during extraction and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DiffAtom {
    /// Stable content-derived identity.
    hash: u64,
    /// Ordinal position among the root's element children.
    pos: usize,
    /// Recorded events plus in-scope prefix bindings.
    seq: EventSequence,
}

impl DiffAtom {
    /// Returns the content identity of this atom.
    ///
    /// Two atoms with equal hashes are treated as equal by the coarse
    /// matcher.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Returns the ordinal position of this atom.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the recorded event sequence.
    pub fn seq(&self) -> &EventSequence {
        &self.seq
    }

    /// Returns the namespace bindings in scope for this atom's content.
    pub fn prefix_mapping(&self) -> &PrefixMapping {
        self.seq.prefix_mapping()
    }
}

/// Builds the ordered atom sequence for one side of the comparison.
///
/// Iterates the root's direct children in document order, skipping text
/// nodes, and records each element together with the prefix bindings
/// declared on it or on an ancestor. The input tree is not modified;
/// the ancestor context is folded into each atom instead of being
/// injected into the element as an xmlns attribute.
pub fn build_atoms(root: &NodeRef, recorder: &DomRecorder) -> Result<Vec<DiffAtom>> {
    let scope = bindings_in_scope(root);
    let borrowed = root.borrow();

    let mut atoms = Vec::new();
    for child in borrowed.children() {
        if !child.borrow().is_element() {
            // Text at this level is formatting between block elements
            continue;
        }
        let mut seq = recorder.process(child)?;
        // Subtree-local declarations stay authoritative; the ancestor
        // scope fills in whatever the subtree did not declare itself.
        seq.prefix_mapping_mut().merge(&scope);
        let hash = seq.content_hash();
        atoms.push(DiffAtom {
            hash,
            pos: atoms.len(),
            seq,
        });
    }

    Ok(atoms)
}
