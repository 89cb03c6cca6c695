//! EPUB metadata extraction
//!
//! Reads `META-INF/container.xml` to locate the OPF package document, then
//! takes Dublin Core fields from its `<metadata>` block:
//! - title: first `dc:title`
//! - author: first `dc:creator`
//! - ISBN: first `dc:identifier` mentioning "isbn", returned whole
//!
//! EPUBs are reflowable, so no page count is reported.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::document::{
    CoverCandidate, DocumentFormat, ExtractError, ExtractResult, ExtractedMetadata, MetadataField,
};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Most bytes read from any single archive entry
///
/// Matches the default upload limit. The size an entry declares is never
/// trusted for allocation.
const MAX_ENTRY_BYTES: u64 = 100 * 1024 * 1024;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Extract metadata from EPUB bytes
pub fn extract_epub(data: &[u8]) -> ExtractResult<ExtractedMetadata> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let container = read_entry(&mut archive, CONTAINER_PATH)?;
    let opf_path = package_path(&container)?;
    let opf = read_entry(&mut archive, &opf_path)?;
    let package = parse_package(&opf)?;

    debug!(
        opf = %opf_path,
        titles = package.titles.len(),
        identifiers = package.identifiers.len(),
        "Parsed EPUB package"
    );

    let mut metadata = ExtractedMetadata::new(DocumentFormat::Epub);
    metadata.book_name = MetadataField::from_option(package.titles.first().cloned());
    metadata.author_name = MetadataField::from_option(package.creators.first().cloned());
    metadata.isbn_number = MetadataField::from_option(
        package
            .identifiers
            .iter()
            .find(|id| id.to_lowercase().contains("isbn"))
            .cloned(),
    );

    if let Some(href) = package.cover_href() {
        let entry = resolve_href(parent_dir(&opf_path), href);
        match read_bytes(&mut archive, &entry) {
            Ok(bytes) => metadata.cover_candidates.push(CoverCandidate::manifest(bytes)),
            Err(e) => warn!(entry = %entry, "Declared cover image is unreadable: {}", e),
        }
    }

    Ok(metadata)
}

fn read_bytes(archive: &mut Archive<'_>, name: &str) -> ExtractResult<Vec<u8>> {
    let file = archive.by_name(name)?;
    read_limited(file, name, MAX_ENTRY_BYTES)
}

/// Read an entry to its end, failing once it passes `limit` bytes
fn read_limited<R: Read>(entry: R, name: &str, limit: u64) -> ExtractResult<Vec<u8>> {
    let mut bytes = Vec::new();
    entry
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| ExtractError::MalformedDocument(format!("{}: {}", name, e)))?;

    if bytes.len() as u64 > limit {
        return Err(ExtractError::MalformedDocument(format!(
            "{} is larger than {} bytes",
            name, limit
        )));
    }
    Ok(bytes)
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> ExtractResult<String> {
    let bytes = read_bytes(archive, name)?;
    String::from_utf8(bytes)
        .map_err(|_| ExtractError::MalformedDocument(format!("{} is not UTF-8", name)))
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// Location of the OPF package document inside the archive
fn package_path(container: &str) -> ExtractResult<String> {
    let mut reader = Reader::from_str(container);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(ExtractError::MalformedDocument(
        "container.xml names no rootfile".to_string(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DcField {
    Title,
    Creator,
    Identifier,
}

impl DcField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"creator" => Some(Self::Creator),
            b"identifier" => Some(Self::Identifier),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ManifestItem {
    id: String,
    href: String,
    properties: String,
}

/// The parts of an OPF package we read
#[derive(Debug, Default)]
struct Package {
    titles: Vec<String>,
    creators: Vec<String>,
    identifiers: Vec<String>,
    cover_id: Option<String>,
    manifest: Vec<ManifestItem>,
}

impl Package {
    /// EPUB 3 `cover-image` item, else the OPF 2 `meta name="cover"` target
    fn cover_href(&self) -> Option<&str> {
        self.manifest
            .iter()
            .find(|item| item.properties.split_whitespace().any(|p| p == "cover-image"))
            .or_else(|| {
                let id = self.cover_id.as_deref()?;
                self.manifest.iter().find(|item| item.id == id)
            })
            .map(|item| item.href.as_str())
            .filter(|href| !href.is_empty())
    }

    fn push(&mut self, field: DcField, value: String) {
        match field {
            DcField::Title => self.titles.push(value),
            DcField::Creator => self.creators.push(value),
            DcField::Identifier => self.identifiers.push(value),
        }
    }

    fn record_element(&mut self, element: &BytesStart<'_>, in_metadata: bool, in_manifest: bool) {
        match element.local_name().as_ref() {
            b"meta" if in_metadata => {
                if attribute(element, b"name").as_deref() == Some("cover") {
                    self.cover_id = attribute(element, b"content");
                }
            }
            b"item" if in_manifest => self.manifest.push(ManifestItem {
                id: attribute(element, b"id").unwrap_or_default(),
                href: attribute(element, b"href").unwrap_or_default(),
                properties: attribute(element, b"properties").unwrap_or_default(),
            }),
            _ => {}
        }
    }
}

fn parse_package(xml: &str) -> ExtractResult<Package> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut package = Package::default();
    let mut in_metadata = false;
    let mut in_manifest = false;
    let mut current: Option<(DcField, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"metadata" => in_metadata = true,
                    b"manifest" => in_manifest = true,
                    local if in_metadata => {
                        if let Some(field) = DcField::from_local_name(local) {
                            current = Some((field, String::new()));
                        }
                    }
                    _ => {}
                }
                package.record_element(&e, in_metadata, in_manifest);
            }
            Event::Empty(e) => package.record_element(&e, in_metadata, in_manifest),
            Event::Text(t) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"metadata" => in_metadata = false,
                b"manifest" => in_manifest = false,
                local => {
                    if let Some((field, buffer)) = current.take() {
                        if DcField::from_local_name(local) == Some(field) {
                            package.push(field, buffer.trim().to_string());
                        } else {
                            current = Some((field, buffer));
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(package)
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a manifest href against the package directory
fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let href = urlencoding::decode(href)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
