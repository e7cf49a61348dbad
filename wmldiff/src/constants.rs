//! Constants used throughout wmldiff.
//!
//! The namespace URIs and prefixes follow the established tracked-change
//! output vocabulary consumed by downstream converters.

/// Namespace URI for the base diff markup vocabulary (the `dfx` prefix).
pub const BASE_NS: &str = "https://www.topologi.com/2005/Diff-X";

/// Namespace URI for delete-marked spans (the `del` prefix).
pub const DELETE_NS: &str = "https://www.topologi.com/2005/Diff-X/Delete";

/// Namespace URI for insert-marked spans (the `ins` prefix).
///
/// This is bound to the same URI as [`BASE_NS`], not a dedicated insert
/// URI. The reuse looks like a defect, but consumers key off the `ins`
/// prefix and correcting it would change the wire format.
pub const INSERT_NS: &str = BASE_NS;

/// Prefix for the base diff markup vocabulary.
pub const BASE_PREFIX: &str = "dfx";

/// Prefix for delete-marked spans.
pub const DELETE_PREFIX: &str = "del";

/// Prefix for inserted-marked spans.
pub const INSERT_PREFIX: &str = "ins";

/// Attribute local name marking an inserted element.
pub const INSERT_ATTR: &str = "insert";

/// Attribute local name marking a deleted element.
pub const DELETE_ATTR: &str = "delete";

/// Attribute local name marking an approximate (uncomputed) diff span.
pub const APPROX_ATTR: &str = "approx";

/// Wrapper element qname for deleted text spans.
pub const DELETE_TEXT_TAG: &str = "del:del";

/// Wrapper element qname for inserted text spans.
pub const INSERT_TEXT_TAG: &str = "ins:ins";

/// Maximum direct element children for which the divide-and-conquer
/// driver is bypassed. At or below this count a direct fine diff already
/// finds shared prefixes and suffixes as effectively as coarse matching.
pub const BYPASS_MAX_CHILDREN: usize = 3;

/// Default cap on the combined event count of a changed run handed to the
/// fine differ. Beyond this the quadratic fine-diff stage becomes
/// impractically slow and the run degrades to whole-range delete+insert.
pub const FINE_EVENT_CAP: usize = 2000;
