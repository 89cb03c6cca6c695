//! Filesystem layout of the book library
//!
//! ```text
//! {root}/{category}/{subcategory}/{book name}/book.{pdf|epub}
//!                                            /cover_image.{ext}
//! ```

mod library;

pub use library::{cover_extension, sanitize_component, BookLocation, LibraryStore, WrittenFiles};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid path component: {0:?}")]
    InvalidPathComponent(String),
}
