//! Category administration endpoints
//!
//! Bodies keep the shapes the admin page expects: `{"message": ...}` on
//! success and `{"error": ...}` on failure.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Category, CategoryRepository, Subcategory};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/getadmincategories", get(list_categories))
        .route("/getadminsubcategories/:category_id", get(list_subcategories))
        .route("/add_category_and_subcategory", post(add_category_and_subcategory))
        .route("/add_subcategory", post(add_subcategory))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type Rejection = (StatusCode, Json<ErrorResponse>);

fn reject(err: AppError) -> Rejection {
    if let AppError::Database(e) = &err {
        tracing::error!("Category update failed: {}", e);
    }
    let status = match &err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn payload<T>(body: std::result::Result<Json<T>, JsonRejection>) -> std::result::Result<T, Rejection> {
    body.map(|Json(value)| value)
        .map_err(|e| reject(AppError::BadRequest(e.body_text())))
}

fn name(value: &str, field: &str) -> std::result::Result<String, Rejection> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(reject(AppError::BadRequest(format!("{} must not be empty", field))));
    }
    Ok(trimmed.to_string())
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.db()).list_categories().await?;
    Ok(Json(categories))
}

async fn list_subcategories(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<Vec<Subcategory>>> {
    let subcategories = CategoryRepository::new(state.db())
        .list_subcategories(category_id)
        .await?;
    Ok(Json(subcategories))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewCategoryRequest {
    pub category_name: String,
    pub subcategory_name: String,
}

async fn add_category_and_subcategory(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewCategoryRequest>, JsonRejection>,
) -> std::result::Result<Json<MessageResponse>, Rejection> {
    let request = payload(body)?;
    let category_name = name(&request.category_name, "category_name")?;
    let subcategory_name = name(&request.subcategory_name, "subcategory_name")?;

    CategoryRepository::new(state.db())
        .create_with_subcategory(&category_name, &subcategory_name)
        .await
        .map_err(reject)?;

    Ok(Json(MessageResponse {
        message: "Category and subcategory added successfully",
    }))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewSubcategoryRequest {
    pub category_id: i64,
    pub subcategory_name: String,
}

async fn add_subcategory(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewSubcategoryRequest>, JsonRejection>,
) -> std::result::Result<Json<MessageResponse>, Rejection> {
    let request = payload(body)?;
    let subcategory_name = name(&request.subcategory_name, "subcategory_name")?;

    CategoryRepository::new(state.db())
        .add_subcategory(request.category_id, &subcategory_name)
        .await
        .map_err(reject)?;

    Ok(Json(MessageResponse {
        message: "Subcategory added successfully",
    }))
}
