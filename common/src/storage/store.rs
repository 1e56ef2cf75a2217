use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::Method;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use futures::{Future, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::signer::Signer;
use object_store::{
    path::Path as ObjPath, Attribute, Attributes, ObjectStore, PutMultipartOpts, WriteMultipart,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::blob::{
    content_disposition, BlobStore, ObjectBody, ObjectMetadata, PresignedLink, StorageError,
};
use super::signing::LocalSigner;
use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Parts buffered by a streaming upload before it waits for the backend to catch up.
const MAX_INFLIGHT_PARTS: usize = 8;

#[derive(Clone)]
enum LinkSigner {
    Local(LocalSigner),
    Remote(Arc<dyn Signer>),
}

/// Process-wide blob storage: one object store backend plus the signer that mints read links
/// for it.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
    local_base: Option<PathBuf>,
    signer: LinkSigner,
}

impl StorageManager {
    /// Create a new StorageManager with the specified configuration.
    pub async fn new(cfg: &AppConfig) -> Result<Self, StorageError> {
        let backend_kind = cfg.storage.clone();
        let (store, local_base, signer) = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
            local_base,
            signer,
        })
    }

    /// Create a StorageManager around a custom backend whose links are signed locally.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind, signer: LocalSigner) -> Self {
        Self {
            store,
            backend_kind,
            local_base: None,
            signer: LinkSigner::Local(signer),
        }
    }

    /// Get the storage backend kind.
    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    /// Access the resolved local base directory when using the local backend.
    pub fn local_base_path(&self) -> Option<&Path> {
        self.local_base.as_deref()
    }

    /// Retrieve bytes from the specified location.
    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    /// Get a streaming handle for large objects.
    pub async fn get_stream(
        &self,
        location: &str,
    ) -> object_store::Result<BoxStream<'static, object_store::Result<Bytes>>> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        Ok(result.into_stream())
    }

    /// List all objects below the specified prefix.
    pub async fn list(
        &self,
        prefix: Option<&str>,
    ) -> object_store::Result<Vec<object_store::ObjectMeta>> {
        let prefix_path = prefix.map(ObjPath::from);
        self.store.list(prefix_path.as_ref()).try_collect().await
    }

    /// Check if an object exists at the specified location.
    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }

    /// Validate a link previously minted by this manager's local signer.
    ///
    /// Backends that sign remotely never serve links through this service, so every link is
    /// rejected for them.
    pub fn verify_local_link(
        &self,
        key: &str,
        expires: i64,
        file_name: &str,
        signature: &str,
    ) -> Result<(), StorageError> {
        match &self.signer {
            LinkSigner::Local(signer) => {
                signer.verify(key, expires, file_name, signature, Utc::now())
            }
            LinkSigner::Remote(_) => Err(StorageError::InvalidSignature),
        }
    }

    /// S3 links are signed over their query string, so response overrides cannot be appended.
    /// The download headers travel with the object instead.
    fn put_options(&self, metadata: &ObjectMetadata) -> PutMultipartOpts {
        if !matches!(self.backend_kind, StorageKind::S3) {
            return PutMultipartOpts::default();
        }

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, metadata.content_type.clone().into());
        attributes.insert(
            Attribute::ContentDisposition,
            content_disposition(&metadata.file_name).into(),
        );

        PutMultipartOpts {
            attributes,
            ..Default::default()
        }
    }

    /// Streams `body` into a multipart upload that is aborted on every failure path,
    /// including the deadline.
    async fn write_object(
        &self,
        key: &str,
        metadata: &ObjectMetadata,
        size_hint: u64,
        body: ObjectBody,
        timeout: Duration,
    ) -> Result<u64, StorageError> {
        let deadline = tokio::time::Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| put_timeout(timeout))?;
        let path = ObjPath::from(key);
        let upload = tokio::time::timeout_at(
            deadline,
            self.store.put_multipart_opts(&path, self.put_options(metadata)),
        )
        .await
        .map_err(|_| put_timeout(timeout))??;
        let mut writer = WriteMultipart::new(upload);

        let streamed =
            tokio::time::timeout_at(deadline, stream_parts(&mut writer, size_hint, body)).await;
        let written = match streamed {
            Ok(Ok(written)) => written,
            Ok(Err(err)) => {
                abort_upload(writer, key).await;
                return Err(err);
            }
            Err(_) => {
                abort_upload(writer, key).await;
                return Err(put_timeout(timeout));
            }
        };

        // Only the final part and the completion call remain; `finish` consumes the writer, so
        // a deadline hit here can no longer abort.
        match tokio::time::timeout_at(deadline, writer.finish()).await {
            Ok(result) => {
                result?;
            }
            Err(_) => {
                warn!(key, "multipart completion timed out; upload may be left incomplete");
                return Err(put_timeout(timeout));
            }
        }
        debug!(key, bytes = written, "object written");

        Ok(written)
    }
}

#[async_trait]
impl BlobStore for StorageManager {
    async fn put_object(
        &self,
        key: &str,
        metadata: &ObjectMetadata,
        size_hint: u64,
        body: ObjectBody,
        timeout: Duration,
    ) -> Result<u64, StorageError> {
        self.write_object(key, metadata, size_hint, body, timeout).await
    }

    async fn presign_get(
        &self,
        key: &str,
        ttl: Duration,
        file_name: &str,
        timeout: Duration,
    ) -> Result<PresignedLink, StorageError> {
        match &self.signer {
            LinkSigner::Local(signer) => signer.sign(key, file_name, ttl, Utc::now()),
            LinkSigner::Remote(signer) => {
                let issued_at = Utc::now();
                let path = ObjPath::from(key);
                let url = with_timeout("presign_get", timeout, async {
                    signer
                        .signed_url(Method::GET, &path, ttl)
                        .await
                        .map_err(StorageError::from)
                })
                .await?;
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| StorageError::Signing(format!("invalid link ttl: {e}")))?;

                Ok(PresignedLink {
                    url,
                    expires_at: issued_at + ttl,
                })
            }
        }
    }
}

/// Feeds `body` into `writer` until every part is handed off, enforcing the declared size.
async fn stream_parts(
    writer: &mut WriteMultipart,
    size_hint: u64,
    mut body: ObjectBody,
) -> Result<u64, StorageError> {
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(StorageError::Body)?;

        written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        if written > size_hint {
            return Err(StorageError::SizeMismatch {
                declared: size_hint,
                actual: written,
            });
        }

        writer.wait_for_capacity(MAX_INFLIGHT_PARTS).await?;
        writer.write(&chunk);
    }

    if written != size_hint {
        return Err(StorageError::SizeMismatch {
            declared: size_hint,
            actual: written,
        });
    }

    writer.wait_for_capacity(0).await?;
    Ok(written)
}

fn put_timeout(timeout: Duration) -> StorageError {
    StorageError::Timeout {
        operation: "put_object",
        timeout,
    }
}

async fn with_timeout<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StorageError::Timeout { operation, timeout })?
}

async fn abort_upload(writer: WriteMultipart, key: &str) {
    if let Err(err) = writer.abort().await {
        warn!(key, error = %err, "failed to abort multipart upload");
    }
}

/// Create a storage backend based on configuration.
async fn create_storage_backend(
    cfg: &AppConfig,
) -> Result<(DynStore, Option<PathBuf>, LinkSigner), StorageError> {
    match cfg.storage {
        StorageKind::Local => {
            let signer = persistent_signer(cfg)?;
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base.clone())?;
            Ok((
                Arc::new(store),
                Some(base),
                LinkSigner::Local(signer),
            ))
        }
        StorageKind::Memory => {
            let store = InMemory::new();
            Ok((Arc::new(store), None, LinkSigner::Local(ephemeral_signer(cfg)?)))
        }
        StorageKind::S3 => {
            let bucket = cfg.s3_bucket.as_deref().ok_or_else(|| {
                StorageError::Signing("s3_bucket must be set for the s3 backend".into())
            })?;
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
            if let Some(region) = &cfg.s3_region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = &cfg.s3_endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            if let Some(access_key_id) = &cfg.s3_access_key_id {
                builder = builder.with_access_key_id(access_key_id);
            }
            if let Some(secret_access_key) = &cfg.s3_secret_access_key {
                builder = builder.with_secret_access_key(secret_access_key);
            }
            let s3 = Arc::new(builder.build()?);
            let store: DynStore = s3.clone();
            Ok((store, None, LinkSigner::Remote(s3)))
        }
    }
}

/// Objects on disk outlive the process, so their links must verify under the same secret
/// after a restart.
fn persistent_signer(cfg: &AppConfig) -> Result<LocalSigner, StorageError> {
    let secret = cfg.link_signing_secret.as_deref().ok_or_else(|| {
        StorageError::Signing("link_signing_secret must be set for the local backend".into())
    })?;
    LocalSigner::new(secret.as_bytes(), &cfg.public_base_url)
}

/// In-memory objects die with the process, so a per-process secret is enough.
fn ephemeral_signer(cfg: &AppConfig) -> Result<LocalSigner, StorageError> {
    match cfg.link_signing_secret.as_deref() {
        Some(secret) => LocalSigner::new(secret.as_bytes(), &cfg.public_base_url),
        None => {
            debug!("link_signing_secret not set; using a per-process secret");
            LocalSigner::new(Uuid::new_v4().as_bytes(), &cfg.public_base_url)
        }
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `data_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    if cfg.data_dir.starts_with('/') {
        PathBuf::from(&cfg.data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&cfg.data_dir)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl StorageManager {
    /// Create an in-memory StorageManager with a fixed signing secret for testing.
    #[allow(clippy::panic)]
    pub fn memory() -> Self {
        let signer = LocalSigner::new(b"test-signing-secret", "http://localhost:4000")
            .unwrap_or_else(|e| panic!("static test signer is valid: {e}"));
        Self::with_backend(Arc::new(InMemory::new()), StorageKind::Memory, signer)
    }
}
