//! In-process document fixtures for tests

use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use zip::{write::SimpleFileOptions, ZipWriter};

/// An image XObject placed in a fixture page's resources
#[derive(Debug, Clone)]
pub struct FixtureImage {
    pub width: i64,
    pub height: i64,
    pub color_space: &'static str,
    pub filter: Option<&'static str>,
    pub data: Vec<u8>,
}

impl FixtureImage {
    /// Uncompressed 8-bit RGB raster
    pub fn rgb(width: i64, height: i64) -> Self {
        let data = (0..width * height * 3).map(|i| (i * 37 % 256) as u8).collect();
        Self {
            width,
            height,
            color_space: "DeviceRGB",
            filter: None,
            data,
        }
    }

    /// Uncompressed 8-bit CMYK raster
    pub fn cmyk(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            color_space: "DeviceCMYK",
            filter: None,
            data: vec![0x40; (width * height * 4) as usize],
        }
    }

    /// A DCT stream; only the bytes matter since it is passed through
    pub fn jpeg() -> Self {
        Self {
            width: 1,
            height: 1,
            color_space: "DeviceRGB",
            filter: Some("DCTDecode"),
            data: vec![
                0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9,
            ],
        }
    }

    /// A stream with a filter the extractor does not decode
    pub fn unsupported() -> Self {
        Self {
            width: 1,
            height: 1,
            color_space: "DeviceGray",
            filter: Some("JBIG2Decode"),
            data: vec![0x00],
        }
    }
}

/// One page of a fixture PDF
#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    pub text: String,
    pub images: Vec<FixtureImage>,
}

impl FixturePage {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: FixtureImage) -> Self {
        self.images.push(image);
        self
    }
}

/// Latin-1 range text as WinAnsi bytes
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Build a PDF with one text line per `\n` and the given image resources
pub fn pdf_fixture(title: Option<&str>, pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for page in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(50), Object::Integer(780)]),
        ];
        for line in page.text.lines() {
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi(line), StringFormat::Literal)],
            ));
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(0), Object::Integer(-16)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));

        let mut xobjects = Dictionary::new();
        for (i, image) in page.images.iter().enumerate() {
            let mut dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width,
                "Height" => image.height,
                "ColorSpace" => image.color_space,
                "BitsPerComponent" => 8,
            };
            if let Some(filter) = image.filter {
                dict.set("Filter", filter);
            }
            let mut stream = Stream::new(dict, image.data.clone());
            stream.allows_compression = false;
            let image_id = doc.add_object(stream);
            xobjects.set(format!("Im{}", i), image_id);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// How a fixture EPUB declares its cover image
#[derive(Debug, Clone, Copy)]
pub enum CoverDeclaration {
    /// EPUB 3 `properties="cover-image"`
    Properties,
    /// OPF 2 `<meta name="cover" content="...">`
    MetaElement,
}

/// Builder for small EPUB containers
#[derive(Debug, Clone, Default)]
pub struct EpubFixture {
    titles: Vec<String>,
    creators: Vec<String>,
    identifiers: Vec<String>,
    cover: Option<(CoverDeclaration, Vec<u8>)>,
    omit_container: bool,
}

pub fn epub_fixture() -> EpubFixture {
    EpubFixture::default()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl EpubFixture {
    pub fn title(mut self, title: &str) -> Self {
        self.titles.push(title.to_string());
        self
    }

    pub fn creator(mut self, creator: &str) -> Self {
        self.creators.push(creator.to_string());
        self
    }

    pub fn identifier(mut self, identifier: &str) -> Self {
        self.identifiers.push(identifier.to_string());
        self
    }

    pub fn cover(mut self, declaration: CoverDeclaration, data: &[u8]) -> Self {
        self.cover = Some((declaration, data.to_vec()));
        self
    }

    pub fn without_container(mut self) -> Self {
        self.omit_container = true;
        self
    }

    fn package_document(&self) -> String {
        let mut metadata = String::new();
        for title in &self.titles {
            metadata.push_str(&format!("    <dc:title>{}</dc:title>\n", escape(title)));
        }
        for creator in &self.creators {
            metadata.push_str(&format!("    <dc:creator>{}</dc:creator>\n", escape(creator)));
        }
        for (i, identifier) in self.identifiers.iter().enumerate() {
            metadata.push_str(&format!(
                "    <dc:identifier id=\"id{}\">{}</dc:identifier>\n",
                i,
                escape(identifier)
            ));
        }

        let mut manifest = String::from(
            "    <item id=\"chap1\" href=\"text/chap1.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
        );
        match &self.cover {
            Some((CoverDeclaration::Properties, _)) => manifest.push_str(
                "    <item id=\"cover-img\" href=\"images/cover.png\" media-type=\"image/png\" properties=\"cover-image\"/>\n",
            ),
            Some((CoverDeclaration::MetaElement, _)) => {
                metadata.push_str("    <meta name=\"cover\" content=\"cover-img\"/>\n");
                manifest.push_str(
                    "    <item id=\"cover-img\" href=\"images/cover.png\" media-type=\"image/png\"/>\n",
                );
            }
            None => {}
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
    <itemref idref="chap1"/>
  </spine>
</package>
"#
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

            zip.start_file("mimetype", options).unwrap();
            zip.write_all(b"application/epub+zip").unwrap();

            if !self.omit_container {
                zip.start_file("META-INF/container.xml", options).unwrap();
                zip.write_all(
                    br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
                )
                .unwrap();
            }

            zip.start_file("OEBPS/content.opf", options).unwrap();
            zip.write_all(self.package_document().as_bytes()).unwrap();

            zip.start_file("OEBPS/text/chap1.xhtml", options).unwrap();
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body><p>Once.</p></body></html>"#,
            )
            .unwrap();

            if let Some((_, data)) = &self.cover {
                zip.start_file("OEBPS/images/cover.png", options).unwrap();
                zip.write_all(data).unwrap();
            }

            zip.finish().unwrap();
        }
        buffer
    }
}

/// A single stored zip entry whose zip64 sizes claim `declared` bytes
///
/// The real content is much shorter and the CRC is left at zero, so a reader
/// that follows the declared size runs into the central directory.
pub fn zip64_entry(name: &str, content: &[u8], declared: u64) -> Vec<u8> {
    const ZIP64_MARKER: u32 = 0xFFFF_FFFF;

    fn zip64_extra(declared: u64) -> Vec<u8> {
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&declared.to_le_bytes());
        extra.extend_from_slice(&declared.to_le_bytes());
        extra
    }

    let name = name.as_bytes();
    let extra = zip64_extra(declared);
    let mut out = Vec::new();

    // Local file header
    out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&ZIP64_MARKER.to_le_bytes());
    out.extend_from_slice(&ZIP64_MARKER.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(&extra);
    out.extend_from_slice(content);

    // Central directory
    let directory_start = out.len() as u32;
    out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&ZIP64_MARKER.to_le_bytes());
    out.extend_from_slice(&ZIP64_MARKER.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(&extra);
    let directory_size = out.len() as u32 - directory_start;

    // End of central directory
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&directory_size.to_le_bytes());
    out.extend_from_slice(&directory_start.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Application state over a throwaway database and library root
///
/// Keep the returned directory alive for the duration of the test.
pub async fn test_state() -> (crate::state::AppState, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = crate::config::Config::default();
    config.database.url = format!("sqlite://{}", dir.path().join("stacks.db").display());
    config.library.root = dir.path().join("library");

    let pool = crate::db::create_pool(&config.database.url).await.unwrap();
    (crate::state::AppState::new(config, pool), dir)
}
