use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::StorageError;
use crate::document::DocumentFormat;

const DOCUMENT_STEM: &str = "book";
const COVER_STEM: &str = "cover_image";
const DEFAULT_COVER_EXTENSION: &str = "jpg";

/// Make a user-supplied name safe to use as one path segment
///
/// Separators become `_` and control characters are dropped. Names that
/// end up empty, `.` or `..` are rejected.
pub fn sanitize_component(raw: &str) -> Result<String, StorageError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(StorageError::InvalidPathComponent(raw.to_string()));
    }
    Ok(cleaned)
}

/// File extension for cover bytes, sniffed from their signature
pub fn cover_extension(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(DEFAULT_COVER_EXTENSION)
}

/// Where one book's files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLocation {
    /// Directories from the library root down to the book directory
    pub dirs: Vec<PathBuf>,
    pub document: PathBuf,
    /// Present only when a cover was chosen
    pub cover: Option<PathBuf>,
}

impl BookLocation {
    pub fn book_dir(&self) -> &Path {
        self.dirs.last().map(PathBuf::as_path).unwrap_or(Path::new(""))
    }
}

/// Root of the on-disk library
#[derive(Debug, Clone)]
pub struct LibraryStore {
    root: PathBuf,
}

impl LibraryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Compute target paths for a submission
    pub fn locate(
        &self,
        category: &str,
        subcategory: &str,
        book_name: &str,
        format: DocumentFormat,
        cover: Option<&[u8]>,
    ) -> Result<BookLocation, StorageError> {
        let mut dirs = Vec::with_capacity(3);
        let mut dir = self.root.clone();
        for component in [category, subcategory, book_name] {
            dir.push(sanitize_component(component)?);
            dirs.push(dir.clone());
        }

        Ok(BookLocation {
            document: dir.join(format!("{}.{}", DOCUMENT_STEM, format.extension())),
            cover: cover.map(|data| dir.join(format!("{}.{}", COVER_STEM, cover_extension(data)))),
            dirs,
        })
    }

    /// Write the document and cover, refusing to overwrite
    ///
    /// Everything created is removed again when the returned guard drops,
    /// unless it is committed first.
    pub async fn write_book(
        &self,
        location: &BookLocation,
        document: &[u8],
        cover: Option<&[u8]>,
    ) -> Result<WrittenFiles, StorageError> {
        fs::create_dir_all(&self.root).await?;

        let mut written = WrittenFiles::default();
        for dir in &location.dirs {
            match fs::create_dir(dir).await {
                Ok(()) => written.dirs.push(dir.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }

        write_new(&mut written, &location.document, document).await?;
        if let (Some(path), Some(data)) = (&location.cover, cover) {
            write_new(&mut written, path, data).await?;
        }

        tracing::debug!(
            document = %location.document.display(),
            files = written.files.len(),
            "Wrote library files"
        );

        Ok(written)
    }
}

async fn write_new(
    written: &mut WrittenFiles,
    path: &Path,
    data: &[u8],
) -> Result<(), StorageError> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(StorageError::AlreadyExists(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    written.files.push(path.to_path_buf());

    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}

/// Files and directories created for one submission
///
/// Dropping the guard without [`commit`](WrittenFiles::commit) deletes them.
#[must_use]
#[derive(Debug, Default)]
pub struct WrittenFiles {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    committed: bool,
}

impl WrittenFiles {
    /// Keep everything that was written
    pub fn commit(mut self) {
        self.committed = true;
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Drop for WrittenFiles {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        for file in self.files.iter().rev() {
            if let Err(e) = std::fs::remove_file(file) {
                tracing::warn!(path = %file.display(), "Failed to roll back file: {}", e);
            }
        }
        // Only directories this submission created, and only if now empty
        for dir in self.dirs.iter().rev() {
            let _ = std::fs::remove_dir(dir);
        }

        if !self.files.is_empty() {
            tracing::info!(files = self.files.len(), "Rolled back library files");
        }
    }
}
