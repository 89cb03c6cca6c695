//! PDF backend
//!
//! MuPDF provides page text, the information dictionary and rendering.
//! Embedded image XObjects are enumerated with lopdf since the MuPDF
//! bindings expose no resource dictionary iteration.

mod document;
mod images;

pub use document::PdfDocument;
