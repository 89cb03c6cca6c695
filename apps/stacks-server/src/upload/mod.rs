//! Per-request upload staging
//!
//! `POST /upload` parks the received bytes here under a fresh token. The
//! token travels back to the client with the metadata preview and
//! identifies the file on finalize, so concurrent uploads never share state.

mod staging;

pub use staging::{StagedUpload, StagingError, StagingStore, CLEANUP_INTERVAL_SECS};
