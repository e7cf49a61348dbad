//! Coarse range matching over atom sequences.
//!
//! The two atom sequences are presented to a range-matching algorithm
//! under the identity equality predicate: two atoms compare equal iff
//! their content hashes match. The algorithm is a capability behind the
//! [`RangeMatcher`] trait so a conforming alternative matcher can be
//! substituted without touching the reconciler.

use similar::{capture_diff_slices, Algorithm, DiffOp};
use tracing::debug;

use crate::atom::DiffAtom;
use crate::error::Result;

/// Kind of a matched run between the two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// Both sides hold identical atoms.
    Equal,
    /// The sides differ over this run.
    Change,
}

/// One run of a coarse match, in atom-index space.
///
/// Produced as an ordered, non-overlapping list whose starts are
/// non-decreasing; gaps between consecutive ranges are equal on both
/// sides by construction. Either side's length may be zero (pure
/// insert or delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDifference {
    /// Kind of this run.
    pub kind: RangeKind,
    /// First left atom index covered.
    pub left_start: usize,
    /// Number of left atoms covered.
    pub left_length: usize,
    /// First right atom index covered.
    pub right_start: usize,
    /// Number of right atoms covered.
    pub right_length: usize,
}

impl RangeDifference {
    /// Returns the exclusive end of the left run.
    pub fn left_end(&self) -> usize {
        self.left_start + self.left_length
    }

    /// Returns the exclusive end of the right run.
    pub fn right_end(&self) -> usize {
        self.right_start + self.right_length
    }
}

/// Capability contract for the coarse matching stage.
///
/// Any failure is fatal to the diff call and is not retried.
pub trait RangeMatcher {
    /// Matches the two atom sequences and returns the runs that differ,
    /// in order. Runs not covered are equal on both sides.
    fn find_differences(
        &self,
        left: &[DiffAtom],
        right: &[DiffAtom],
    ) -> Result<Vec<RangeDifference>>;
}

/// Default matcher: Myers diff over atom content identities.
#[derive(Debug, Default)]
pub struct MyersRangeMatcher;

impl MyersRangeMatcher {
    /// Creates the default matcher.
    pub fn new() -> Self {
        MyersRangeMatcher
    }
}

/// Runs Myers over two identity sequences and coalesces adjacent
/// delete+insert pairs into replace ops, so downstream range handling
/// sees one change run per contiguous difference.
pub(crate) fn myers_diff_ops(old: &[u64], new: &[u64]) -> Vec<DiffOp> {
    let ops = capture_diff_slices(Algorithm::Myers, old, new);
    let mut merged: Vec<DiffOp> = Vec::with_capacity(ops.len());
    for op in ops {
        let last = merged.last().copied();
        match (last, op) {
            (
                Some(DiffOp::Delete {
                    old_index,
                    old_len,
                    new_index,
                }),
                DiffOp::Insert {
                    old_index: ins_old,
                    new_index: ins_new,
                    new_len,
                },
            ) if ins_old == old_index + old_len && ins_new == new_index => {
                if let Some(slot) = merged.last_mut() {
                    *slot = DiffOp::Replace {
                        old_index,
                        old_len,
                        new_index,
                        new_len,
                    };
                }
            }
            (
                Some(DiffOp::Insert {
                    old_index,
                    new_index,
                    new_len,
                }),
                DiffOp::Delete {
                    old_index: del_old,
                    old_len,
                    new_index: del_new,
                },
            ) if del_old == old_index && del_new == new_index + new_len => {
                if let Some(slot) = merged.last_mut() {
                    *slot = DiffOp::Replace {
                        old_index,
                        old_len,
                        new_index,
                        new_len,
                    };
                }
            }
            _ => merged.push(op),
        }
    }
    merged
}

impl RangeMatcher for MyersRangeMatcher {
    fn find_differences(
        &self,
        left: &[DiffAtom],
        right: &[DiffAtom],
    ) -> Result<Vec<RangeDifference>> {
        let left_ids: Vec<u64> = left.iter().map(DiffAtom::hash).collect();
        let right_ids: Vec<u64> = right.iter().map(DiffAtom::hash).collect();

        let mut ranges = Vec::new();
        for op in myers_diff_ops(&left_ids, &right_ids) {
            match op {
                DiffOp::Equal { .. } => {
                    // Equal runs are implied by the gaps between changes
                }
                DiffOp::Delete {
                    old_index,
                    old_len,
                    new_index,
                } => ranges.push(RangeDifference {
                    kind: RangeKind::Change,
                    left_start: old_index,
                    left_length: old_len,
                    right_start: new_index,
                    right_length: 0,
                }),
                DiffOp::Insert {
                    old_index,
                    new_index,
                    new_len,
                } => ranges.push(RangeDifference {
                    kind: RangeKind::Change,
                    left_start: old_index,
                    left_length: 0,
                    right_start: new_index,
                    right_length: new_len,
                }),
                DiffOp::Replace {
                    old_index,
                    old_len,
                    new_index,
                    new_len,
                } => ranges.push(RangeDifference {
                    kind: RangeKind::Change,
                    left_start: old_index,
                    left_length: old_len,
                    right_start: new_index,
                    right_length: new_len,
                }),
            }
        }

        debug!(
            left_atoms = left.len(),
            right_atoms = right.len(),
            changed_ranges = ranges.len(),
            "coarse match complete"
        );
        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::build_atoms;
    use crate::config::DiffConfig;
    use crate::event::DomRecorder;
    use crate::xml::{document_element, parse_str};

    fn atoms_of(xml: &str) -> Vec<DiffAtom> {
        let root = parse_str(xml).unwrap();
        let doc = document_element(&root).unwrap();
        build_atoms(&doc, &DomRecorder::new(DiffConfig::default())).unwrap()
    }

    #[test]
    fn test_identical_sequences_have_no_ranges() {
        let left = atoms_of("<body><p>A</p><p>B</p><p>C</p><p>D</p></body>");
        let right = atoms_of("<body><p>A</p><p>B</p><p>C</p><p>D</p></body>");

        let ranges = MyersRangeMatcher::new().find_differences(&left, &right).unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_single_replaced_atom() {
        let left = atoms_of("<body><p>A</p><p>B</p><p>C</p><p>D</p></body>");
        let right = atoms_of("<body><p>A</p><p>X</p><p>C</p><p>D</p></body>");

        let ranges = MyersRangeMatcher::new().find_differences(&left, &right).unwrap();
        assert_eq!(ranges.len(), 1);
        let r = ranges[0];
        assert_eq!(r.kind, RangeKind::Change);
        assert_eq!((r.left_start, r.left_length), (1, 1));
        assert_eq!((r.right_start, r.right_length), (1, 1));
    }

    #[test]
    fn test_pure_insert_has_zero_left_length() {
        let left = atoms_of("<body><p>A</p><p>B</p><p>C</p><p>D</p></body>");
        let right = atoms_of("<body><p>A</p><p>B</p><p>C</p><p>D</p><p>E</p></body>");

        let ranges = MyersRangeMatcher::new().find_differences(&left, &right).unwrap();
        assert_eq!(ranges.len(), 1);
        let r = ranges[0];
        assert_eq!(r.left_length, 0);
        assert_eq!(r.left_start, 4);
        assert_eq!((r.right_start, r.right_length), (4, 1));
    }

    #[test]
    fn test_ranges_ordered_and_non_overlapping() {
        let left = atoms_of("<body><p>A</p><p>B</p><p>C</p><p>D</p><p>E</p></body>");
        let right = atoms_of("<body><p>A</p><p>x</p><p>C</p><p>y</p><p>E</p></body>");

        let ranges = MyersRangeMatcher::new().find_differences(&left, &right).unwrap();
        assert!(!ranges.is_empty());
        let mut prev_end = 0;
        for r in &ranges {
            assert!(r.left_start >= prev_end);
            prev_end = r.left_end();
        }
    }

    #[test]
    fn test_empty_left_sequence() {
        let left = atoms_of("<body></body>");
        let right = atoms_of("<body><p>A</p></body>");

        let ranges = MyersRangeMatcher::new().find_differences(&left, &right).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].left_length, 0);
        assert_eq!(ranges[0].right_length, 1);
    }
}
