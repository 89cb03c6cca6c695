//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Catalog of finalized books
CREATE TABLE IF NOT EXISTS books_table (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book_name TEXT NOT NULL,
    author TEXT,
    isbn TEXT,
    total_pages INTEGER,
    book_path TEXT NOT NULL UNIQUE,
    image_path TEXT,
    category TEXT NOT NULL,
    subcategory TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '',
    book_index TEXT NOT NULL DEFAULT '',
    db_insertion_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_category ON books_table(category, subcategory);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS subcategories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subcategory_name TEXT NOT NULL,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,

    UNIQUE(category_id, subcategory_name)
);

CREATE INDEX IF NOT EXISTS idx_subcategories_category ON subcategories(category_id);
"#;
