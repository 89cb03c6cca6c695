//! Book catalog rows

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// One finalized book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub book_name: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_pages: Option<i64>,
    pub book_path: String,
    pub image_path: Option<String>,
    pub category: String,
    pub subcategory: String,
    pub keywords: String,
    pub book_index: String,
    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub db_insertion_time: String,
}

/// Values for a new catalog row
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub book_name: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_pages: Option<i64>,
    pub book_path: String,
    pub image_path: Option<String>,
    pub category: String,
    pub subcategory: String,
    pub keywords: String,
    pub book_index: String,
    pub db_insertion_time: String,
}

pub struct BookRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BookRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<BookRecord>> {
        let book = sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT id, book_name, author, isbn, total_pages, book_path, image_path,
                   category, subcategory, keywords, book_index, db_insertion_time
            FROM books_table
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(book)
    }

    /// All books, newest first
    pub async fn list(&self) -> Result<Vec<BookRecord>> {
        let books = sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT id, book_name, author, isbn, total_pages, book_path, image_path,
                   category, subcategory, keywords, book_index, db_insertion_time
            FROM books_table
            ORDER BY id DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(books)
    }

    pub async fn insert(&self, book: &NewBook) -> Result<BookRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO books_table (book_name, author, isbn, total_pages, book_path, image_path,
                                     category, subcategory, keywords, book_index, db_insertion_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.book_name)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.total_pages)
        .bind(&book.book_path)
        .bind(&book.image_path)
        .bind(&book.category)
        .bind(&book.subcategory)
        .bind(&book.keywords)
        .bind(&book.book_index)
        .bind(&book.db_insertion_time)
        .execute(self.pool)
        .await?;

        self.get(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch inserted book".to_string()))
    }
}
