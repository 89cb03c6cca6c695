//! Extraction error types

use thiserror::Error;

/// Errors raised while reading a document for its metadata
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Declared content type is not one we can extract from
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The parser rejected the bytes
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// An image could not be decoded or re-encoded
    #[error("Image error: {0}")]
    Image(String),

    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),

    /// The blocking extraction task panicked or was cancelled
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Result type alias for extraction operations
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

impl From<mupdf::Error> for ExtractError {
    fn from(err: mupdf::Error) -> Self {
        ExtractError::MalformedDocument(err.to_string())
    }
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        ExtractError::MalformedDocument(format!("EPUB container: {}", err))
    }
}

impl From<quick_xml::Error> for ExtractError {
    fn from(err: quick_xml::Error) -> Self {
        ExtractError::MalformedDocument(format!("EPUB package XML: {}", err))
    }
}

impl From<image::ImageError> for ExtractError {
    fn from(err: image::ImageError) -> Self {
        ExtractError::Image(err.to_string())
    }
}
