//! In-memory staging store with expiry

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::DocumentFormat;

/// How often the background task purges expired uploads
pub const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Upper bound on the staging lifetime
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StagingError {
    #[error("upload {0} not found; upload the file first")]
    NotFound(String),

    #[error("upload {0} has expired; upload the file again")]
    Expired(String),

    #[error("staging is full ({limit} bytes); finalize or discard pending uploads")]
    Full { limit: usize },
}

/// A document received by `POST /upload` and not yet finalized
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub token: Uuid,
    /// File name as sent by the client
    pub file_name: String,
    pub format: DocumentFormat,
    pub data: Bytes,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StagedUpload {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Uploads awaiting finalize, keyed by token
#[derive(Clone)]
pub struct StagingStore {
    inner: Arc<StagingStoreInner>,
}

struct StagingStoreInner {
    uploads: RwLock<HashMap<Uuid, StagedUpload>>,
    ttl: Duration,
    /// Ceiling on the summed size of staged documents
    max_bytes: usize,
}

impl StagingStore {
    pub fn new(ttl_secs: u64, max_bytes: usize) -> Self {
        Self {
            inner: Arc::new(StagingStoreInner {
                uploads: RwLock::new(HashMap::new()),
                ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
                max_bytes,
            }),
        }
    }

    /// Parse a client-supplied token
    pub fn parse_token(token: &str) -> Result<Uuid, StagingError> {
        Uuid::parse_str(token.trim()).map_err(|_| StagingError::NotFound(token.to_string()))
    }

    /// Store a new upload under a fresh token
    ///
    /// Expired uploads are dropped first. Fails with [`StagingError::Full`]
    /// when the new document would take staged bytes past the ceiling.
    pub async fn stage(
        &self,
        file_name: String,
        format: DocumentFormat,
        data: Bytes,
    ) -> Result<StagedUpload, StagingError> {
        let created_at = Utc::now();
        let mut uploads = self.inner.uploads.write().await;
        uploads.retain(|_, upload| upload.expires_at > created_at);

        let staged: usize = uploads.values().map(|upload| upload.data.len()).sum();
        if staged.saturating_add(data.len()) > self.inner.max_bytes {
            tracing::warn!(
                staged_bytes = staged,
                incoming_bytes = data.len(),
                limit = self.inner.max_bytes,
                "Rejected upload, staging is full"
            );
            return Err(StagingError::Full {
                limit: self.inner.max_bytes,
            });
        }

        let upload = StagedUpload {
            token: Uuid::new_v4(),
            file_name,
            format,
            data,
            created_at,
            expires_at: created_at + self.inner.ttl,
        };

        uploads.insert(upload.token, upload.clone());
        drop(uploads);

        tracing::info!(
            upload_token = %upload.token,
            file_name = %upload.file_name,
            bytes = upload.data.len(),
            "Staged upload"
        );

        Ok(upload)
    }

    /// Look up an upload without consuming it
    pub async fn get(&self, token: Uuid) -> Result<StagedUpload, StagingError> {
        let upload = {
            let uploads = self.inner.uploads.read().await;
            uploads
                .get(&token)
                .cloned()
                .ok_or_else(|| StagingError::NotFound(token.to_string()))?
        };

        if upload.is_expired() {
            self.inner.uploads.write().await.remove(&token);
            return Err(StagingError::Expired(token.to_string()));
        }

        Ok(upload)
    }

    /// Remove an upload for finalizing
    ///
    /// Only one caller can take a given token. Pair with [`restore`] if the
    /// finalize fails so the client can retry.
    ///
    /// [`restore`]: StagingStore::restore
    pub async fn take(&self, token: Uuid) -> Result<StagedUpload, StagingError> {
        let upload = self
            .inner
            .uploads
            .write()
            .await
            .remove(&token)
            .ok_or_else(|| StagingError::NotFound(token.to_string()))?;

        if upload.is_expired() {
            return Err(StagingError::Expired(token.to_string()));
        }

        Ok(upload)
    }

    /// Put back an upload whose finalize failed
    pub async fn restore(&self, upload: StagedUpload) {
        tracing::debug!(upload_token = %upload.token, "Restored staged upload");
        self.inner.uploads.write().await.insert(upload.token, upload);
    }

    /// Drop an upload the client no longer wants
    pub async fn discard(&self, token: Uuid) -> Result<StagedUpload, StagingError> {
        let upload = self
            .inner
            .uploads
            .write()
            .await
            .remove(&token)
            .ok_or_else(|| StagingError::NotFound(token.to_string()))?;

        tracing::info!(upload_token = %token, "Discarded staged upload");
        Ok(upload)
    }

    pub async fn len(&self) -> usize {
        self.inner.uploads.read().await.len()
    }

    /// Remove expired uploads, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut uploads = self.inner.uploads.write().await;
        let before = uploads.len();
        uploads.retain(|_, upload| upload.expires_at > now);
        let count = before - uploads.len();

        if count > 0 {
            tracing::info!(count = count, "Cleaned up expired uploads");
        }

        count
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}
