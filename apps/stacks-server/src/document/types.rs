//! Extraction record types

use serde::{Deserialize, Serialize};

use crate::codec;

/// Document format accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Epub,
}

impl DocumentFormat {
    /// Detect format from a declared MIME type
    ///
    /// Parameters such as `; charset=binary` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case("application/pdf") {
            Some(Self::Pdf)
        } else if essence.eq_ignore_ascii_case("application/epub+zip") {
            Some(Self::Epub)
        } else {
            None
        }
    }

    /// Canonical MIME type
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Epub => "application/epub+zip",
        }
    }

    /// File extension used when the document is written to the library
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
        }
    }

    /// Text that stands in for a field the extractor could not recover
    ///
    /// Clients compare against these exact strings, so they must not change.
    pub fn sentinel(self, kind: FieldKind) -> &'static str {
        match (self, kind) {
            (Self::Pdf, FieldKind::Title) => "Unknown Title",
            (Self::Pdf, FieldKind::Author) => "Unknown Author",
            (Self::Pdf, FieldKind::Isbn) => "Unknown ISBN",
            (Self::Pdf, FieldKind::Pages) | (Self::Epub, _) => "Unknown",
        }
    }
}

/// Which preview field a sentinel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Author,
    Isbn,
    Pages,
}

/// A recovered metadata value, or the explicit absence of one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetadataField {
    Found(String),
    #[default]
    Absent,
}

impl MetadataField {
    /// Build from an optional value; blank strings count as absent
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self::Found(v),
            _ => Self::Absent,
        }
    }

    /// Build from matcher output; blank text counts as absent
    pub fn from_text(value: String) -> Self {
        Self::from_option(Some(value))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Found(v) => Some(v),
            Self::Absent => None,
        }
    }

    /// The value, or `sentinel` when absent
    pub fn or_sentinel<'a>(&'a self, sentinel: &'a str) -> &'a str {
        self.value().unwrap_or(sentinel)
    }
}

/// Where a cover candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSource {
    /// Raster embedded on a page (0-indexed)
    Embedded { page: usize },
    /// Rendering of the first page
    RenderedPage,
    /// Cover image declared in an EPUB manifest
    Manifest,
}

/// A still image offered to the client as a possible cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverCandidate {
    pub source: CoverSource,
    pub data: Vec<u8>,
}

impl CoverCandidate {
    pub fn embedded(page: usize, data: Vec<u8>) -> Self {
        Self {
            source: CoverSource::Embedded { page },
            data,
        }
    }

    pub fn rendered(data: Vec<u8>) -> Self {
        Self {
            source: CoverSource::RenderedPage,
            data,
        }
    }

    pub fn manifest(data: Vec<u8>) -> Self {
        Self {
            source: CoverSource::Manifest,
            data,
        }
    }
}

/// Metadata recovered from a single uploaded document
///
/// Cover candidates are kept in extraction order; clients select by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub format: DocumentFormat,
    pub book_name: MetadataField,
    pub author_name: MetadataField,
    pub isbn_number: MetadataField,
    /// Page count of the whole document; `None` for reflowable formats
    pub total_pages: Option<usize>,
    pub cover_candidates: Vec<CoverCandidate>,
}

impl ExtractedMetadata {
    /// An empty record with every field absent
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            book_name: MetadataField::Absent,
            author_name: MetadataField::Absent,
            isbn_number: MetadataField::Absent,
            total_pages: None,
            cover_candidates: Vec::new(),
        }
    }

    /// Render the record in its client-facing shape
    pub fn preview(&self) -> MetadataPreview {
        let sentinel = |kind| self.format.sentinel(kind);

        MetadataPreview {
            book_name: self.book_name.or_sentinel(sentinel(FieldKind::Title)).to_string(),
            author_name: self.author_name.or_sentinel(sentinel(FieldKind::Author)).to_string(),
            isbn_number: self.isbn_number.or_sentinel(sentinel(FieldKind::Isbn)).to_string(),
            total_pages: match self.total_pages {
                Some(count) => PageCount::Known(count),
                None => PageCount::Unknown(sentinel(FieldKind::Pages)),
            },
            image_base64_list: self
                .cover_candidates
                .iter()
                .map(|cover| codec::encode_image(&cover.data))
                .collect(),
        }
    }
}

/// Page count as sent to clients: a number, or the "Unknown" sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageCount {
    Known(usize),
    Unknown(&'static str),
}

/// Preview payload returned from the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataPreview {
    pub book_name: String,
    pub author_name: String,
    pub isbn_number: String,
    pub total_pages: PageCount,
    pub image_base64_list: Vec<String>,
}
