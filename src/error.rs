use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatError {
    /// A mutation precondition was violated. The table is left untouched.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Raster source does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("Unhandled RAT field type code: {0}")]
    UnhandledType(u8),

    /// Row/column counts diverged after a rebuild. This means the writer
    /// itself is broken, not that the caller did anything wrong.
    #[error("Attribute table is inconsistent: {0}")]
    DataInconsistency(String),

    #[error("Malformed attribute table: {0}")]
    Codec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RatError>;
