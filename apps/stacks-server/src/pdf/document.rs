//! MuPDF-backed page access

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};
use mupdf::{Colorspace, Matrix, MetadataName, TextPageOptions};

use crate::document::{DocumentFormat, ExtractError, ExtractResult};
use crate::extract::PdfPages;

use super::images::EmbeddedImages;

/// Scale used when rasterising a page (1.0 = 72 dpi)
const RENDER_SCALE: f32 = 1.0;

/// An opened PDF
///
/// Holds a MuPDF document, which is not `Send`; open and drop it on the
/// same thread.
pub struct PdfDocument {
    doc: mupdf::Document,
    images: EmbeddedImages,
}

impl PdfDocument {
    pub fn from_bytes(data: &[u8]) -> ExtractResult<Self> {
        let doc = mupdf::Document::from_bytes(data, DocumentFormat::Pdf.mime_type())?;
        let images = EmbeddedImages::load(data);
        Ok(Self { doc, images })
    }
}

impl PdfPages for PdfDocument {
    fn page_count(&self) -> ExtractResult<usize> {
        Ok(self.doc.page_count()?.max(0) as usize)
    }

    fn title(&self) -> Option<String> {
        self.doc
            .metadata(MetadataName::Title)
            .ok()
            .filter(|s| !s.trim().is_empty())
    }

    fn page_text(&self, index: usize) -> ExtractResult<String> {
        let page = self.doc.load_page(index as i32)?;
        let text_page = page.to_text_page(TextPageOptions::empty())?;
        Ok(text_page.to_text()?)
    }

    fn page_images(&self, index: usize, limit: usize) -> Vec<Vec<u8>> {
        self.images.page_images(index, limit)
    }

    fn render_page(&self, index: usize) -> ExtractResult<Vec<u8>> {
        let page = self.doc.load_page(index as i32)?;
        let matrix = Matrix::new_scale(RENDER_SCALE, RENDER_SCALE);
        let colorspace = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        encode_pixmap(&pixmap)
    }
}

/// Encode a MuPDF pixmap as PNG
fn encode_pixmap(pixmap: &mupdf::Pixmap) -> ExtractResult<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;
    if n == 0 {
        return Err(ExtractError::Image("pixmap has no components".to_string()));
    }

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for pixel in samples.chunks_exact(n).take((width * height) as usize) {
        let (r, g, b) = match n {
            1 | 2 => (pixel[0], pixel[0], pixel[0]),
            _ => (pixel[0], pixel[1], pixel[2]),
        };
        let a = if n == 2 || n >= 4 { pixel[n - 1] } else { 255 };
        rgba.extend_from_slice(&[r, g, b, a]);
    }

    let img = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| ExtractError::Image("pixmap smaller than its dimensions".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
