//! wmldiff - Divide-and-conquer XML diff with tracked-change output
//!
//! This library compares two XML documents and emits the left document
//! annotated with insert and delete markers describing how to reach the
//! right document. The markup is meant for downstream conversion into
//! word-processing tracked changes.
//!
//! # Overview
//!
//! Word-processing document bodies are long flat lists of paragraph
//! elements, which defeats naive tree differencing. The driver splits
//! the comparison instead:
//!
//! - the top-level children of each root become opaque atoms identified
//!   by a content hash,
//! - a coarse matcher finds the runs of atoms that differ,
//! - only those runs are handed to the fine event-sequence differ,
//! - unchanged atoms stream into the output verbatim.
//!
//! Small or structurally incompatible documents bypass the division and
//! are diffed whole.
//!
//! # Example
//!
//! ```no_run
//! use wmldiff::{document_element, parse_file, DocDiffer, Error};
//!
//! fn run() -> Result<(), Error> {
//!     let left = parse_file("old.xml")?;
//!     let right = parse_file("new.xml")?;
//!     let left_root = document_element(&left)
//!         .ok_or_else(|| Error::Parse("empty document".to_string()))?;
//!     let right_root = document_element(&right)
//!         .ok_or_else(|| Error::Parse("empty document".to_string()))?;
//!
//!     let mut output = Vec::new();
//!     DocDiffer::new().diff(&left_root, &right_root, &mut output)?;
//!     Ok(())
//! }
//! ```

pub mod atom;
pub mod config;
pub mod constants;
pub mod differ;
pub mod driver;
pub mod error;
pub mod event;
pub mod format;
pub mod matcher;
pub mod node;
pub mod xml;

// Re-export commonly used types
pub use config::DiffConfig;
pub use constants::*;
pub use driver::DocDiffer;
pub use error::{Error, Result};
pub use node::{
    bindings_in_scope, new_node, NodeInner, NodeRef, PrefixMapping, XmlContent, XmlElement,
    XmlText,
};
pub use xml::{document_element, parse_file, parse_str, XmlParser};

// Re-export the stage seams
pub use atom::{build_atoms, DiffAtom};
pub use differ::{EventDiffer, TreeEventDiffer};
pub use event::{DiffEvent, DomRecorder, EventSequence};
pub use format::{DiffOutput, TrackedChangeFormatter};
pub use matcher::{MyersRangeMatcher, RangeDifference, RangeKind, RangeMatcher};
