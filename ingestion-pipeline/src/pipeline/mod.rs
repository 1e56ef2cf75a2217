mod config;
mod context;
mod stages;
mod state;

pub use config::IngestionConfig;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{
        blob::{BlobStore, ObjectBody},
        catalog::CatalogStore,
    },
};
use tracing::info;
use uuid::Uuid;

use crate::guard::CollectionGuard;

use self::{
    context::IngestContext,
    stages::{admit, issue_link, register, upload},
    state::ready,
};

/// One document upload as handed over by the transport layer.
pub struct IngestionRequest {
    pub collection_id: Uuid,
    pub file_name: String,
    pub declared_size: u64,
    pub body: ObjectBody,
}

/// Admits, stores, links and registers documents, in that order.
///
/// A catalog row is only ever written after its object is durable, so a failure at any stage
/// leaves at most an unreferenced object behind.
#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    catalog: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
    guard: CollectionGuard,
    pipeline_config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStore>,
        pipeline_config: IngestionConfig,
    ) -> Self {
        let guard = CollectionGuard::new(Arc::clone(&catalog), pipeline_config.lookup_timeout);
        Self {
            catalog,
            blobs,
            guard,
            pipeline_config,
        }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    #[tracing::instrument(
        skip_all,
        fields(
            collection_id = %request.collection_id,
            declared_size = request.declared_size
        )
    )]
    pub async fn ingest(&self, request: IngestionRequest) -> Result<Uuid, AppError> {
        let IngestionRequest {
            collection_id,
            file_name,
            declared_size,
            body,
        } = request;

        let mut ctx = IngestContext::new(
            collection_id,
            file_name,
            declared_size,
            body,
            &self.pipeline_config,
            &self.guard,
            self.catalog.as_ref(),
            self.blobs.as_ref(),
        );

        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = admit(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let admit_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = upload(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let upload_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = issue_link(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let link_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = register(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let register_duration = stage_start.elapsed();

        let document_id = ctx.document_id()?;
        info!(
            %collection_id,
            %document_id,
            bytes = ctx.bytes_written,
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            admit_ms = Self::duration_millis(admit_duration),
            upload_ms = Self::duration_millis(upload_duration),
            link_ms = Self::duration_millis(link_duration),
            register_ms = Self::duration_millis(register_duration),
            "document ingested"
        );

        Ok(document_id)
    }
}
