//! XML parsing for input documents.

mod parser;

pub use parser::{document_element, parse_file, parse_str, XmlParser};
