//! Embedded raster enumeration via lopdf
//!
//! Image XObjects are taken from each page's resource dictionary in the
//! order it lists them. JPEG and JPEG 2000 streams are returned as stored;
//! plain or Flate-compressed 8-bit samples are re-encoded as PNG.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::warn;

use crate::document::{ExtractError, ExtractResult};

/// Guard against cyclic `Parent` or reference chains
const MAX_LOOKUP_DEPTH: usize = 32;

/// Filters whose output is already a standalone image file
const PASSTHROUGH_FILTERS: &[&[u8]] = &[b"DCTDecode", b"JPXDecode"];

/// Object-level view of a PDF used only for image lookup
pub struct EmbeddedImages {
    doc: Option<Document>,
    pages: BTreeMap<u32, ObjectId>,
}

impl EmbeddedImages {
    /// Parse the object graph
    ///
    /// A file lopdf cannot read yields no embedded images rather than an
    /// error, since MuPDF may still open it.
    pub fn load(data: &[u8]) -> Self {
        match Document::load_mem(data) {
            Ok(doc) => {
                let pages = doc.get_pages();
                Self {
                    doc: Some(doc),
                    pages,
                }
            }
            Err(e) => {
                warn!("Object parser rejected PDF, skipping embedded images: {}", e);
                Self {
                    doc: None,
                    pages: BTreeMap::new(),
                }
            }
        }
    }

    /// Encoded images of a 0-based page
    ///
    /// At most `limit` image XObjects are considered. One that fails to
    /// decode is skipped and still counts toward the limit.
    pub fn page_images(&self, index: usize, limit: usize) -> Vec<Vec<u8>> {
        let Some(doc) = &self.doc else {
            return Vec::new();
        };
        let Some(&page_id) = self.pages.get(&(index as u32 + 1)) else {
            return Vec::new();
        };
        let Some(xobjects) = page_resources(doc, page_id)
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|object| resolve(doc, object))
            .and_then(|object| object.as_dict().ok())
        else {
            return Vec::new();
        };

        let mut images = Vec::new();
        let mut listed = 0;
        for (name, object) in xobjects.iter() {
            if listed >= limit {
                break;
            }
            let Some(stream) = resolve(doc, object).and_then(|o| o.as_stream().ok()) else {
                continue;
            };
            if !is_image(&stream.dict) {
                continue;
            }
            listed += 1;

            match encode_image_stream(doc, stream) {
                Ok(bytes) => images.push(bytes),
                Err(e) => warn!(
                    page = index,
                    xobject = %String::from_utf8_lossy(name),
                    "Skipping embedded image: {}",
                    e
                ),
            }
        }
        images
    }
}

/// Follow indirect references to a direct object
fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_LOOKUP_DEPTH {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Resource dictionary of a page, inherited from the page tree if needed
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_LOOKUP_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
}

fn filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| resolve(doc, f)) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> ExtractResult<i64> {
    dict.get(key)
        .ok()
        .and_then(|v| resolve(doc, v))
        .and_then(|v| v.as_i64().ok())
        .ok_or_else(|| {
            ExtractError::Image(format!("missing /{}", String::from_utf8_lossy(key)))
        })
}

/// Components per sample for the colour spaces we convert
fn components(doc: &Document, dict: &Dictionary) -> ExtractResult<usize> {
    let space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|v| resolve(doc, v))
        .ok_or_else(|| ExtractError::Image("missing /ColorSpace".to_string()))?;

    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
            b"DeviceCMYK" | b"CMYK" => Ok(4),
            other => Err(ExtractError::Image(format!(
                "unsupported colour space /{}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|f| f.as_name().ok());
            let profile = items
                .get(1)
                .and_then(|p| resolve(doc, p))
                .and_then(|p| p.as_stream().ok());
            match (family, profile) {
                (Some(b"ICCBased"), Some(profile)) => {
                    let n = integer(doc, &profile.dict, b"N")?;
                    match n {
                        1 | 3 | 4 => Ok(n as usize),
                        other => Err(ExtractError::Image(format!(
                            "ICC profile with {} components",
                            other
                        ))),
                    }
                }
                _ => Err(ExtractError::Image(
                    "unsupported colour space array".to_string(),
                )),
            }
        }
        _ => Err(ExtractError::Image("invalid /ColorSpace".to_string())),
    }
}

fn encode_image_stream(doc: &Document, stream: &Stream) -> ExtractResult<Vec<u8>> {
    let filters = filters(doc, &stream.dict);

    if let [only] = filters.as_slice() {
        if PASSTHROUGH_FILTERS.contains(&only.as_slice()) {
            return Ok(stream.content.clone());
        }
    }

    let samples = match filters.as_slice() {
        [] => stream.content.clone(),
        [flate] if flate.as_slice() == b"FlateDecode" => stream
            .decompressed_content()
            .map_err(|e| ExtractError::Image(format!("inflate failed: {}", e)))?,
        other => {
            let names: Vec<String> = other
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            return Err(ExtractError::Image(format!(
                "unsupported filter chain {:?}",
                names
            )));
        }
    };

    let bits = integer(doc, &stream.dict, b"BitsPerComponent")?;
    if bits != 8 {
        return Err(ExtractError::Image(format!(
            "{} bits per component",
            bits
        )));
    }

    let width = u32::try_from(integer(doc, &stream.dict, b"Width")?)
        .map_err(|_| ExtractError::Image("negative /Width".to_string()))?;
    let height = u32::try_from(integer(doc, &stream.dict, b"Height")?)
        .map_err(|_| ExtractError::Image("negative /Height".to_string()))?;
    let n = components(doc, &stream.dict)?;

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(n))
        .ok_or_else(|| {
            ExtractError::Image(format!("{}x{} image is too large", width, height))
        })?;
    if samples.len() < expected {
        return Err(ExtractError::Image(format!(
            "expected {} sample bytes, found {}",
            expected,
            samples.len()
        )));
    }
    let samples = &samples[..expected];

    let image = match n {
        1 => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        _ => RgbImage::from_raw(width, height, cmyk_to_rgb(samples)).map(DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| ExtractError::Image("sample buffer does not match dimensions".to_string()))?;

    let mut output = Vec::new();
    image.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u16;
            let channel = |c: u8| ((255 - c as u16) * k / 255) as u8;
            [channel(px[0]), channel(px[1]), channel(px[2])]
        })
        .collect()
}
