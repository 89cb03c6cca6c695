//! Metadata extraction for uploaded documents
//!
//! - `patterns`: title/author/ISBN matchers over page text
//! - `pdf`: paged extraction with embedded and rendered cover candidates
//! - `epub`: Dublin Core metadata from the OPF package

pub mod epub;
pub mod patterns;
pub mod pdf;

use std::time::Duration;

use axum::body::Bytes;
use tokio::time::timeout;

use crate::document::{DocumentFormat, ExtractError, ExtractResult, ExtractedMetadata};

pub use pdf::PdfPages;

/// Extract metadata from a document held in memory
///
/// The input is only read, so repeated calls on the same bytes agree.
pub fn extract_document(format: DocumentFormat, data: &[u8]) -> ExtractResult<ExtractedMetadata> {
    match format {
        DocumentFormat::Pdf => pdf::extract_pdf_bytes(data),
        DocumentFormat::Epub => epub::extract_epub(data),
    }
}

/// Run [`extract_document`] on the blocking pool with a deadline
///
/// Parser handles are created and dropped inside the blocking task.
pub async fn extract_in_background(
    format: DocumentFormat,
    data: Bytes,
    timeout_secs: u64,
) -> ExtractResult<ExtractedMetadata> {
    let result = timeout(
        Duration::from_secs(timeout_secs),
        tokio::task::spawn_blocking(move || extract_document(format, &data)),
    )
    .await;

    match result {
        Ok(join_result) => join_result.map_err(|e| ExtractError::Task(e.to_string()))?,
        Err(_) => Err(ExtractError::Timeout(timeout_secs)),
    }
}
