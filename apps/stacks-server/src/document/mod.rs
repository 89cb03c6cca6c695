//! Document model shared by the PDF and EPUB extractors
//!
//! An extraction produces an [`ExtractedMetadata`] record. Fields that could
//! not be recovered are [`MetadataField::Absent`] internally and only turn
//! into their "Unknown ..." sentinel text when rendered as a
//! [`MetadataPreview`] for the client.

mod error;
mod types;

pub use error::{ExtractError, ExtractResult};
pub use types::{
    CoverCandidate, CoverSource, DocumentFormat, ExtractedMetadata, FieldKind, MetadataField,
    MetadataPreview, PageCount,
};
