//! Error types for the conversion engine.

use thiserror::Error;

/// Errors raised while converting a Notion export archive.
///
/// `MissingBody`, `MissingId` and `UnrecognizedPropertyType` are fatal for
/// the document that raised them only; the surrounding batch keeps going.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("page body was not found in: {0}")]
    MissingBody(String),

    #[error("no page id found for: {0}")]
    MissingId(String),

    #[error("unrecognized property type: {0}")]
    UnrecognizedPropertyType(String),

    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
