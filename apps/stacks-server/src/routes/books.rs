//! Catalog listing

use axum::{extract::State, Json};

use crate::db::{BookRecord, BookRepository};
use crate::error::Result;
use crate::state::AppState;

/// List every catalog row, newest first
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<BookRecord>>> {
    let books = BookRepository::new(state.db()).list().await?;
    Ok(Json(books))
}
