//! PDF metadata extraction
//!
//! Container metadata wins for the title. Otherwise the first pages are
//! scanned for text and each field is taken from the first page that yields
//! it. Cover candidates are the embedded rasters of the first pages followed
//! by a rendering of page one.

use tracing::debug;

use crate::document::{
    CoverCandidate, DocumentFormat, ExtractResult, ExtractedMetadata, MetadataField,
};
use crate::pdf::PdfDocument;

use super::patterns;

/// Pages scanned for title/author/ISBN text
pub const TEXT_SCAN_PAGES: usize = 10;

/// Pages whose embedded images are offered as covers
pub const COVER_SCAN_PAGES: usize = 3;

/// Embedded images taken from any one page
pub const IMAGES_PER_PAGE: usize = 3;

/// Matcher default; blank text reads back as an absent field
const NO_MATCH: &str = "";

/// Page-level access to an opened PDF
///
/// Indices are 0-based.
pub trait PdfPages {
    /// Number of pages in the whole document
    fn page_count(&self) -> ExtractResult<usize>;

    /// Title from the document information dictionary, if any
    fn title(&self) -> Option<String>;

    /// Plain text of one page
    fn page_text(&self, index: usize) -> ExtractResult<String>;

    /// Encoded embedded rasters of one page in listing order, at most `limit`
    fn page_images(&self, index: usize, limit: usize) -> Vec<Vec<u8>>;

    /// Encoded rendering of one page
    fn render_page(&self, index: usize) -> ExtractResult<Vec<u8>>;
}

/// Open and extract a PDF from raw bytes
pub fn extract_pdf_bytes(data: &[u8]) -> ExtractResult<ExtractedMetadata> {
    let document = PdfDocument::from_bytes(data)?;
    extract_pdf(&document)
}

/// Extract metadata through any page backend
pub fn extract_pdf<P: PdfPages + ?Sized>(pages: &P) -> ExtractResult<ExtractedMetadata> {
    let mut metadata = ExtractedMetadata::new(DocumentFormat::Pdf);
    metadata.book_name = MetadataField::from_option(pages.title());

    let page_count = pages.page_count()?;
    metadata.total_pages = Some(page_count);

    for index in 0..page_count.min(TEXT_SCAN_PAGES) {
        if !metadata.book_name.is_absent()
            && !metadata.author_name.is_absent()
            && !metadata.isbn_number.is_absent()
        {
            break;
        }

        let text = pages.page_text(index)?;
        debug!(page = index, chars = text.len(), "Scanning page text");

        if metadata.book_name.is_absent() {
            metadata.book_name = MetadataField::from_text(patterns::extract_title(&text, NO_MATCH));
        }
        if metadata.author_name.is_absent() {
            metadata.author_name = MetadataField::from_text(patterns::extract_author(&text, NO_MATCH));
        }
        if metadata.isbn_number.is_absent() {
            metadata.isbn_number = MetadataField::from_text(patterns::extract_isbn(&text, NO_MATCH));
        }
    }

    metadata.cover_candidates = collect_cover_candidates(pages, page_count)?;

    Ok(metadata)
}

/// Embedded images of the first pages, then the rendered first page
pub fn collect_cover_candidates<P: PdfPages + ?Sized>(
    pages: &P,
    page_count: usize,
) -> ExtractResult<Vec<CoverCandidate>> {
    let mut candidates = Vec::new();

    for index in 0..page_count.min(COVER_SCAN_PAGES) {
        let images = pages.page_images(index, IMAGES_PER_PAGE);
        debug!(page = index, images = images.len(), "Collected embedded images");
        candidates.extend(
            images
                .into_iter()
                .take(IMAGES_PER_PAGE)
                .map(|data| CoverCandidate::embedded(index, data)),
        );
    }

    if page_count > 0 {
        candidates.push(CoverCandidate::rendered(pages.render_page(0)?));
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::document::{CoverSource, ExtractError};
    use crate::testing::{pdf_fixture, FixtureImage, FixturePage};

    /// In-memory page backend
    struct FakePdf {
        title: Option<String>,
        texts: Vec<String>,
        images: Vec<usize>,
        text_requests: RefCell<Vec<usize>>,
    }

    impl FakePdf {
        fn new(pages: usize) -> Self {
            Self {
                title: None,
                texts: vec![String::new(); pages],
                images: vec![0; pages],
                text_requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl PdfPages for FakePdf {
        fn page_count(&self) -> ExtractResult<usize> {
            Ok(self.texts.len())
        }

        fn title(&self) -> Option<String> {
            self.title.clone()
        }

        fn page_text(&self, index: usize) -> ExtractResult<String> {
            self.text_requests.borrow_mut().push(index);
            Ok(self.texts[index].clone())
        }

        fn page_images(&self, index: usize, limit: usize) -> Vec<Vec<u8>> {
            (0..self.images[index].min(limit))
                .map(|i| vec![index as u8, i as u8])
                .collect()
        }

        fn render_page(&self, index: usize) -> ExtractResult<Vec<u8>> {
            Ok(vec![0xEE, index as u8])
        }
    }

    #[test]
    fn test_container_title_wins() {
        let mut pdf = FakePdf::new(2);
        pdf.title = Some("Real Title".into());
        pdf.texts[0] = "Title: Other".into();

        let metadata = extract_pdf(&pdf).unwrap();
        assert_eq!(metadata.book_name.value(), Some("Real Title"));
    }

    #[test]
    fn test_blank_container_title_falls_back_to_text() {
        let mut pdf = FakePdf::new(2);
        pdf.title = Some("  ".into());
        pdf.texts[1] = "Title: Example Book".into();

        let metadata = extract_pdf(&pdf).unwrap();
        assert_eq!(metadata.book_name.value(), Some("Example Book"));
        assert!(metadata.author_name.is_absent());
        assert_eq!(metadata.preview().author_name, "Unknown Author");
        assert_eq!(metadata.preview().isbn_number, "Unknown ISBN");
    }

    #[test]
    fn test_earliest_page_wins_per_field() {
        let mut pdf = FakePdf::new(4);
        pdf.texts[0] = "ISBN 111".into();
        pdf.texts[1] = "Copyright © 2001 by First Author\nISBN 222".into();
        pdf.texts[2] = "Copyright © 2002 by Second Author".into();

        let metadata = extract_pdf(&pdf).unwrap();
        assert_eq!(metadata.isbn_number.value(), Some("111"));
        assert_eq!(metadata.author_name.value(), Some("First Author"));
    }

    #[test]
    fn test_text_scan_is_bounded() {
        let mut pdf = FakePdf::new(25);
        pdf.texts[12] = "Title: Too Late".into();

        let metadata = extract_pdf(&pdf).unwrap();
        assert!(metadata.book_name.is_absent());
        assert_eq!(metadata.total_pages, Some(25));
        assert_eq!(*pdf.text_requests.borrow(), (0..TEXT_SCAN_PAGES).collect::<Vec<_>>());
    }

    #[test]
    fn test_scan_stops_once_everything_is_found() {
        let mut pdf = FakePdf::new(6);
        pdf.title = Some("Known".into());
        pdf.texts[1] = "Copyright © 1999 by A. Author\nISBN-13: 978-1".into();

        extract_pdf(&pdf).unwrap();
        assert_eq!(*pdf.text_requests.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_cover_candidates_are_capped_and_ordered() {
        let mut pdf = FakePdf::new(5);
        pdf.images = vec![2, 5, 0, 4, 4];

        let metadata = extract_pdf(&pdf).unwrap();
        let sources: Vec<CoverSource> = metadata
            .cover_candidates
            .iter()
            .map(|c| c.source)
            .collect();
        assert_eq!(
            sources,
            vec![
                CoverSource::Embedded { page: 0 },
                CoverSource::Embedded { page: 0 },
                CoverSource::Embedded { page: 1 },
                CoverSource::Embedded { page: 1 },
                CoverSource::Embedded { page: 1 },
                CoverSource::RenderedPage,
            ]
        );
        assert_eq!(metadata.cover_candidates[5].data, vec![0xEE, 0]);
    }

    #[test]
    fn test_empty_document_has_no_covers() {
        let pdf = FakePdf::new(0);

        let metadata = extract_pdf(&pdf).unwrap();
        assert_eq!(metadata.total_pages, Some(0));
        assert!(metadata.cover_candidates.is_empty());
        assert!(pdf.text_requests.borrow().is_empty());
    }

    #[test]
    fn test_extracts_real_pdf() {
        let data = pdf_fixture(
            None,
            &[
                FixturePage::text("Title: Example Book")
                    .with_image(FixtureImage::rgb(2, 2))
                    .with_image(FixtureImage::jpeg()),
                FixturePage::text("Copyright © 2010 by Ada Writer\nISBN-10: 0-306-40615-2"),
                FixturePage::text("Chapter 1"),
                FixturePage::text("Chapter 2"),
            ],
        );

        let metadata = extract_pdf_bytes(&data).unwrap();
        assert_eq!(metadata.book_name.value(), Some("Example Book"));
        assert_eq!(metadata.author_name.value(), Some("Ada Writer"));
        assert_eq!(metadata.isbn_number.value(), Some("0-306-40615-2"));
        assert_eq!(metadata.total_pages, Some(4));

        let covers = &metadata.cover_candidates;
        assert_eq!(covers.len(), 3);
        assert!(covers[0].data.starts_with(b"\x89PNG"));
        assert_eq!(covers[1].data, FixtureImage::jpeg().data);
        assert_eq!(covers[2].source, CoverSource::RenderedPage);
        assert!(covers[2].data.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_info_title_beats_page_text() {
        let data = pdf_fixture(
            Some("Catalogued Name"),
            &[FixturePage::text("Title: Printed Name")],
        );

        let metadata = extract_pdf_bytes(&data).unwrap();
        assert_eq!(metadata.book_name.value(), Some("Catalogued Name"));
    }

    #[test]
    fn test_total_pages_counts_whole_document() {
        let pages: Vec<FixturePage> = (0..14)
            .map(|i| FixturePage::text(&format!("Page {}", i + 1)))
            .collect();

        let metadata = extract_pdf_bytes(&pdf_fixture(None, &pages)).unwrap();
        assert_eq!(metadata.total_pages, Some(14));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let data = pdf_fixture(
            Some("Twice"),
            &[FixturePage::text("ISBN 42").with_image(FixtureImage::rgb(3, 1))],
        );
        let before = data.clone();

        let first = extract_pdf_bytes(&data).unwrap();
        let second = extract_pdf_bytes(&data).unwrap();
        assert_eq!(first, second);
        assert_eq!(data, before);
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let result = extract_pdf_bytes(b"this is plain text, not a PDF");
        assert!(matches!(result, Err(ExtractError::MalformedDocument(_))));
    }
}
