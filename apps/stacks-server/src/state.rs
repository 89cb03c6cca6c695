//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::storage::LibraryStore;
use crate::upload::StagingStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    staging: StagingStore,
    library: LibraryStore,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let staging = StagingStore::new(
            config.upload.staging_ttl_secs,
            config.upload.max_staged_bytes,
        );
        let library = LibraryStore::new(config.library.root.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                staging,
                library,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Uploads awaiting finalize
    pub fn staging(&self) -> &StagingStore {
        &self.inner.staging
    }

    /// On-disk book library
    pub fn library(&self) -> &LibraryStore {
        &self.inner.library
    }
}
