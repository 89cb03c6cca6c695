//! Finalizing a staged upload into the catalog
//!
//! A submission writes the document, optionally its cover, and one
//! `books_table` row. The files are rolled back if the row cannot be
//! inserted, so a failed submission leaves no trace.

use sqlx::SqlitePool;

use crate::db::{BookRecord, BookRepository, NewBook};
use crate::error::Result;
use crate::storage::LibraryStore;
use crate::upload::StagedUpload;

/// Timestamp format stored in `db_insertion_time`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// User-confirmed fields for one book
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub book_name: String,
    pub author_name: Option<String>,
    pub isbn_number: Option<String>,
    pub total_pages: Option<i64>,
    pub category: String,
    pub subcategory: String,
    /// Decoded bytes of the chosen cover
    pub cover_image: Option<Vec<u8>>,
    pub keywords: String,
    pub index: String,
}

/// Page count as typed by the user; anything non-numeric is unknown
pub fn parse_total_pages(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|pages| *pages >= 0)
}

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn insertion_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Persist a staged upload with its confirmed metadata
pub async fn submit(
    pool: &SqlitePool,
    library: &LibraryStore,
    upload: &StagedUpload,
    submission: &Submission,
) -> Result<BookRecord> {
    let cover = submission.cover_image.as_deref();
    let location = library.locate(
        &submission.category,
        &submission.subcategory,
        &submission.book_name,
        upload.format,
        cover,
    )?;

    let written = library.write_book(&location, &upload.data, cover).await?;

    let record = BookRepository::new(pool)
        .insert(&NewBook {
            book_name: submission.book_name.clone(),
            author: submission.author_name.clone(),
            isbn: submission.isbn_number.clone(),
            total_pages: submission.total_pages,
            book_path: location.document.display().to_string(),
            image_path: location.cover.as_ref().map(|p| p.display().to_string()),
            category: submission.category.clone(),
            subcategory: submission.subcategory.clone(),
            keywords: submission.keywords.clone(),
            book_index: submission.index.clone(),
            db_insertion_time: insertion_timestamp(),
        })
        .await?;

    written.commit();

    tracing::info!(
        upload_token = %upload.token,
        book_id = record.id,
        path = %record.book_path,
        "Book added to catalog"
    );

    Ok(record)
}
