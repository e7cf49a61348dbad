//! Error types for wmldiff.

use thiserror::Error;

/// Result type alias for wmldiff operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a diff run.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The coarse matcher or fine differ was handed malformed or
    /// incomparable sequences.
    #[error("Comparison error: {0}")]
    Comparison(String),

    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
