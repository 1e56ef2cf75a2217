use common::{
    error::AppError,
    storage::{
        blob::{BlobStore, ObjectBody, PresignedLink},
        catalog::CatalogStore,
    },
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::guard::CollectionGuard;

use super::config::IngestionConfig;

pub struct IngestContext<'a> {
    pub collection_id: Uuid,
    pub file_name: String,
    pub declared_size: u64,
    pub config: &'a IngestionConfig,
    pub guard: &'a CollectionGuard,
    pub catalog: &'a dyn CatalogStore,
    pub blobs: &'a dyn BlobStore,
    pub document_id: Option<Uuid>,
    pub body: Option<ObjectBody>,
    pub bytes_written: u64,
    pub link: Option<PresignedLink>,
}

impl<'a> IngestContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collection_id: Uuid,
        file_name: String,
        declared_size: u64,
        body: ObjectBody,
        config: &'a IngestionConfig,
        guard: &'a CollectionGuard,
        catalog: &'a dyn CatalogStore,
        blobs: &'a dyn BlobStore,
    ) -> Self {
        Self {
            collection_id,
            file_name,
            declared_size,
            config,
            guard,
            catalog,
            blobs,
            document_id: None,
            body: Some(body),
            bytes_written: 0,
            link: None,
        }
    }

    pub fn document_id(&self) -> Result<Uuid, AppError> {
        self.document_id
            .ok_or_else(|| AppError::InternalError("document id expected to be assigned".into()))
    }

    pub fn take_body(&mut self) -> Result<ObjectBody, AppError> {
        self.body.take().ok_or_else(|| {
            AppError::InternalError("upload body expected to be available".into())
        })
    }

    pub fn take_link(&mut self) -> Result<PresignedLink, AppError> {
        self.link.take().ok_or_else(|| {
            AppError::InternalError("access link expected to be available for registration".into())
        })
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        if matches!(err, AppError::NotFound(_) | AppError::Validation(_)) {
            warn!(
                collection_id = %self.collection_id,
                document_id = ?self.document_id,
                error = %err,
                "ingestion rejected"
            );
        } else {
            error!(
                collection_id = %self.collection_id,
                document_id = ?self.document_id,
                error = %err,
                "ingestion pipeline aborted"
            );
        }
        err
    }
}
