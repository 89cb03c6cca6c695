//! Upload and finalize endpoints
//!
//! - `POST /upload`: multipart `file`; returns the metadata preview and an
//!   `upload_token`
//! - `DELETE /upload/:token`: drop a staged upload
//! - `POST /final_submit`: URL-encoded form naming the token and the
//!   confirmed fields

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{self, Submission};
use crate::codec;
use crate::db::BookRecord;
use crate::document::{DocumentFormat, MetadataPreview};
use crate::error::{AppError, Result};
use crate::extract::extract_in_background;
use crate::state::AppState;
use crate::upload::StagingStore;

const SUBMIT_SUCCESS: &str = "File and images saved and data inserted successfully";

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_document))
        .route("/upload/:token", delete(discard_upload))
        .route("/final_submit", post(final_submit))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Preview returned from `POST /upload`
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub preview: MetadataPreview,
    pub upload_token: Uuid,
}

fn is_octet_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/octet-stream"))
        .unwrap_or(false)
}

/// Declared content type first; the file extension only when nothing useful was declared
fn detect_format(content_type: Option<&str>, file_name: &str) -> Option<DocumentFormat> {
    match content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && !is_octet_stream(ct))
    {
        Some(declared) => DocumentFormat::from_mime(declared),
        None => mime_guess::from_path(file_name)
            .first()
            .and_then(|guess| DocumentFormat::from_mime(guess.essence_str())),
    }
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut received = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;

        received = Some((file_name, content_type, data));
        break;
    }

    let Some((file_name, content_type, data)) = received else {
        return Err(AppError::BadRequest("No file part".to_string()));
    };
    if file_name.is_empty() {
        return Err(AppError::BadRequest("No selected file".to_string()));
    }

    let format = detect_format(content_type.as_deref(), &file_name).ok_or_else(|| {
        AppError::UnsupportedFormat(content_type.clone().unwrap_or_default())
    })?;

    tracing::debug!(
        file_name = %file_name,
        format = ?format,
        bytes = data.len(),
        "Extracting metadata"
    );

    let metadata =
        extract_in_background(format, data.clone(), state.config().upload.extract_timeout_secs)
            .await?;
    let upload = state.staging().stage(file_name, format, data).await?;

    Ok(Json(UploadResponse {
        preview: metadata.preview(),
        upload_token: upload.token,
    }))
}

async fn discard_upload(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode> {
    let token = StagingStore::parse_token(&token)?;
    state.staging().discard(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fields of the finalize form, named as the admin front end sends them
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSubmitForm {
    pub upload_token: Option<String>,
    pub book_name: Option<String>,
    pub author_name: Option<String>,
    pub isbn_number: Option<String>,
    pub total_pages: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub index: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| AppError::BadRequest(format!("Missing required field: {}", field)))
}

impl FinalSubmitForm {
    fn into_submission(self) -> Result<Submission> {
        let cover_image = non_blank(self.cover_image)
            .map(|encoded| codec::decode_image(&encoded))
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("coverImage is not valid base64: {}", e)))?;

        Ok(Submission {
            book_name: required(self.book_name, "bookName")?,
            author_name: non_blank(self.author_name),
            isbn_number: non_blank(self.isbn_number),
            total_pages: self
                .total_pages
                .as_deref()
                .and_then(catalog::parse_total_pages),
            category: required(self.category, "category")?,
            subcategory: required(self.subcategory, "subcategory")?,
            cover_image,
            keywords: self.keywords,
            index: self.index,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FinalSubmitResponse {
    pub message: &'static str,
    pub book: BookRecord,
}

async fn final_submit(
    State(state): State<AppState>,
    Form(mut form): Form<FinalSubmitForm>,
) -> Result<Json<FinalSubmitResponse>> {
    let token = non_blank(form.upload_token.take())
        .ok_or_else(|| AppError::MissingUploadContext("No file data available".to_string()))?;
    let token = StagingStore::parse_token(&token)?;
    let submission = form.into_submission()?;

    // Detached so a dropped connection cannot stop it between the file
    // writes and the catalog insert
    let book = tokio::spawn(finalize(state, token, submission))
        .await
        .map_err(|e| AppError::Internal(format!("Finalize task failed: {}", e)))??;

    Ok(Json(FinalSubmitResponse {
        message: SUBMIT_SUCCESS,
        book,
    }))
}

/// Consume a staged upload into the catalog, restoring it on failure
async fn finalize(state: AppState, token: Uuid, submission: Submission) -> Result<BookRecord> {
    let upload = state.staging().take(token).await?;
    match catalog::submit(state.db(), state.library(), &upload, &submission).await {
        Ok(book) => Ok(book),
        Err(e) => {
            state.staging().restore(upload).await;
            Err(e)
        }
    }
}
