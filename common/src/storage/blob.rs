use std::{path::Path, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use mime_guess::from_path;
use thiserror::Error;
use url::Url;

/// Streamed object contents handed to [`BlobStore::put_object`].
pub type ObjectBody = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("blob store operation `{operation}` timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("blob store backend error: {0}")]
    Backend(#[from] object_store::Error),
    #[error("failed to read upload body: {0}")]
    Body(#[source] std::io::Error),
    #[error("declared size {declared} does not match the {actual} bytes received")]
    SizeMismatch { declared: u64, actual: u64 },
    #[error("failed to sign link: {0}")]
    Signing(String),
    #[error("link has expired")]
    LinkExpired,
    #[error("link signature is invalid")]
    InvalidSignature,
}

/// A time-limited read URL together with the instant it stops working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedLink {
    pub url: Url,
    pub expires_at: DateTime<Utc>,
}

/// Headers the object should be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub file_name: String,
}

impl ObjectMetadata {
    pub fn for_file_name(file_name: &str) -> Self {
        Self {
            content_type: guess_mime_type(Path::new(file_name)),
            file_name: file_name.to_string(),
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Streams `body` to `key`. Returns the number of bytes written, which always equals
    /// `size_hint` on success.
    async fn put_object(
        &self,
        key: &str,
        metadata: &ObjectMetadata,
        size_hint: u64,
        body: ObjectBody,
        timeout: Duration,
    ) -> Result<u64, StorageError>;

    /// Issues a read URL for `key` valid for `ttl` that downloads as `file_name`.
    async fn presign_get(
        &self,
        key: &str,
        ttl: Duration,
        file_name: &str,
        timeout: Duration,
    ) -> Result<PresignedLink, StorageError>;
}

/// Guesses the MIME type based on the file extension.
pub fn guess_mime_type(path: &Path) -> String {
    from_path(path)
        .first_or(mime::APPLICATION_OCTET_STREAM)
        .to_string()
}

/// Builds an `attachment` disposition for an untrusted file name.
///
/// Quotes, backslashes and control characters are dropped so the value stays a single
/// well-formed header.
pub fn content_disposition(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "attachment".to_string();
    }
    format!("attachment; filename=\"{cleaned}\"")
}
