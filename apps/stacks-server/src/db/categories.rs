//! Category and subcategory tables

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub category_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Subcategory {
    pub id: i64,
    pub subcategory_name: String,
}

/// Map a UNIQUE violation to a conflict, anything else to a database error
fn conflict_on_duplicate(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::Database(err),
    }
}

pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, category_name FROM categories ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Subcategories of one category; empty when the category is unknown
    pub async fn list_subcategories(&self, category_id: i64) -> Result<Vec<Subcategory>> {
        let subcategories = sqlx::query_as::<_, Subcategory>(
            "SELECT id, subcategory_name FROM subcategories WHERE category_id = ? ORDER BY id",
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;

        Ok(subcategories)
    }

    /// Create a category together with its first subcategory
    ///
    /// Both rows are written in one transaction.
    pub async fn create_with_subcategory(
        &self,
        category_name: &str,
        subcategory_name: &str,
    ) -> Result<(Category, Subcategory)> {
        let mut tx = self.pool.begin().await?;

        let category_id = sqlx::query("INSERT INTO categories (category_name) VALUES (?)")
            .bind(category_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_duplicate(e, "Category"))?
            .last_insert_rowid();

        let subcategory_id = sqlx::query(
            "INSERT INTO subcategories (subcategory_name, category_id) VALUES (?, ?)",
        )
        .bind(subcategory_name)
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Subcategory"))?
        .last_insert_rowid();

        tx.commit().await?;

        tracing::info!(
            category_id = category_id,
            subcategory_id = subcategory_id,
            "Created category with subcategory"
        );

        Ok((
            Category {
                id: category_id,
                category_name: category_name.to_string(),
            },
            Subcategory {
                id: subcategory_id,
                subcategory_name: subcategory_name.to_string(),
            },
        ))
    }

    /// Add a subcategory to an existing category
    pub async fn add_subcategory(
        &self,
        category_id: i64,
        subcategory_name: &str,
    ) -> Result<Subcategory> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Category {} not found", category_id)));
        }

        let id = sqlx::query(
            "INSERT INTO subcategories (subcategory_name, category_id) VALUES (?, ?)",
        )
        .bind(subcategory_name)
        .bind(category_id)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Subcategory"))?
        .last_insert_rowid();

        tracing::info!(category_id = category_id, subcategory_id = id, "Added subcategory");

        Ok(Subcategory {
            id,
            subcategory_name: subcategory_name.to_string(),
        })
    }
}
