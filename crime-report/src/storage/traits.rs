//! Content storage interfaces.
//!
//! Content is pinned through a pinning service and read back through a
//! public gateway; both are keyed by the content hash (CID).

use async_trait::async_trait;

use crate::types::ContentHash;

/// Content storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with an error status
    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    /// Content not found at the gateway
    #[error("Content not found: {0}")]
    NotFound(String),

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Service unavailable (used by the devnet store)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// What is being pinned; decides the content type and file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Evidence file (image, video, ...)
    Media,
    /// Report companion document
    Json,
    /// Resolution message, admin name, health probe
    Text,
}

impl PinKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            PinKind::Media => "application/octet-stream",
            PinKind::Json => "application/json",
            PinKind::Text => "text/plain",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            PinKind::Media => "media",
            PinKind::Json => "report.json",
            PinKind::Text => "message.txt",
        }
    }
}

/// Pinning service: stores bytes, returns their content hash.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn pin(&self, data: &[u8], kind: PinKind) -> Result<ContentHash, StorageError>;
}

/// Gateway resolving content hashes to bytes.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Public URL for a content hash. Computing it never touches the network.
    fn url(&self, hash: &ContentHash) -> String;

    /// Fetch the bytes behind a content hash.
    async fn fetch(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError>;

    /// Fetch content as UTF-8 text.
    async fn fetch_text(&self, hash: &ContentHash) -> Result<String, StorageError> {
        let bytes = self.fetch(hash).await?;
        String::from_utf8(bytes)
            .map_err(|_| StorageError::InvalidResponse(format!("{} is not UTF-8 text", hash)))
    }
}
