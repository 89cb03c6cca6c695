//! HTTP routes for Stacks Server
//!
//! Paths and form field names match the bundled admin page.

pub mod admin;
pub mod books;
pub mod categories;
pub mod health;
pub mod upload;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/admin", get(admin::admin_page))
        .route("/books", get(books::list_books))
        .merge(upload::router(state.config().upload.max_upload_bytes))
        .merge(categories::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
