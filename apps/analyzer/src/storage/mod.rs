//! DocumentFetcher: resolves a document reference to a storage key and reads
//! the full document from a content store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::Url;
use thiserror::Error;
use tracing::info;

use crate::models::ResumeDocument;
use crate::retry::{RetryPolicy, Retryable};

pub mod local;
pub mod s3;

pub use local::LocalContentStore;
pub use s3::S3ContentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("invalid document reference: {0}")]
    InvalidReference(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("content store did not answer within {0:?}")]
    Timeout(Duration),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transfer(_) | StoreError::Timeout(_))
    }

    fn timed_out(after: Duration) -> Self {
        StoreError::Timeout(after)
    }
}

/// Key-addressable blob storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Reads the full content stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Startup reachability probe.
    async fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

pub struct DocumentFetcher {
    store: Arc<dyn ContentStore>,
    retry: RetryPolicy,
}

impl DocumentFetcher {
    pub fn new(store: Arc<dyn ContentStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn fetch(&self, document_ref: &str) -> Result<ResumeDocument, StoreError> {
        let key = resolve_key(document_ref)?;
        let bytes = self.retry.run("fetch", || self.store.get(&key)).await?;

        info!(
            key = %key,
            store = self.store.name(),
            size = bytes.len(),
            "document retrieved"
        );
        Ok(ResumeDocument { bytes })
    }
}

/// Maps a document reference to a storage key.
///
/// URLs (`https://account.blob.core.windows.net/resumes/user_42_cv.pdf`,
/// `blob://bucket/u42.pdf`) resolve to their final, percent-decoded path
/// segment. Anything that does not parse as a URL is already a key.
pub fn resolve_key(document_ref: &str) -> Result<String, StoreError> {
    let trimmed = document_ref.trim();

    let key = match Url::parse(trimmed) {
        Ok(url) if !url.cannot_be_a_base() => url
            .path_segments()
            .and_then(|segments| segments.last())
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .unwrap_or_default(),
        _ => trimmed.to_string(),
    };

    if key.trim().is_empty() {
        return Err(StoreError::InvalidReference(document_ref.to_string()));
    }
    Ok(key)
}
