//! Error types for epidoc-convert operations.

use thiserror::Error;

/// Errors that can occur while preprocessing, parsing, converting or writing
/// a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("Undefined entity reference: &{0};")]
    UnknownEntity(String),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Invalid table file: {0}")]
    Tables(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
