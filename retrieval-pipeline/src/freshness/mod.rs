mod config;

pub use config::FreshnessConfig;

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use common::{
    error::AppError,
    storage::{
        blob::BlobStore,
        catalog::CatalogStore,
        types::document::{Document, DocumentLink},
    },
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Serves a collection's documents with links that are valid at the time of the call.
///
/// Expired links are re-signed on the spot and written back on a best-effort basis; there is
/// no background refresher.
pub struct LinkResolver {
    catalog: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
    config: FreshnessConfig,
}

impl LinkResolver {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStore>,
        config: FreshnessConfig,
    ) -> Self {
        Self {
            catalog,
            blobs,
            config,
        }
    }

    /// Lists the documents of `collection_id` in the order the catalog returns them. That
    /// order is not stable across calls.
    ///
    /// An unknown collection simply has no documents. A presign failure fails the whole call;
    /// a failure to persist a refreshed link does not.
    #[instrument(skip(self), fields(collection_id = %collection_id))]
    pub async fn list_fresh_documents(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<DocumentLink>, AppError> {
        let started = Instant::now();
        let documents = self
            .catalog
            .documents_in_collection(collection_id, self.config.lookup_timeout)
            .await?;

        let mut links = Vec::with_capacity(documents.len());
        let mut refreshed = 0_usize;

        for document in documents {
            // Earlier refreshes may have taken a while, so staleness is judged per row.
            if document.link_is_stale(Utc::now(), self.config.refresh_margin) {
                links.push(self.refresh(&document).await?);
                refreshed = refreshed.saturating_add(1);
            } else {
                links.push(DocumentLink {
                    filename: document.file_name,
                    link: document.link,
                    document_id: document.id,
                });
            }
        }

        info!(
            %collection_id,
            documents = links.len(),
            refreshed,
            total_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "documents resolved"
        );

        Ok(links)
    }

    async fn refresh(&self, document: &Document) -> Result<DocumentLink, AppError> {
        let link = self
            .blobs
            .presign_get(
                &document.id,
                self.config.link_ttl,
                &document.file_name,
                self.config.lookup_timeout,
            )
            .await?;

        self.persist_link(&document.id, link.url.as_str(), link.expires_at)
            .await;

        Ok(DocumentLink {
            filename: document.file_name.clone(),
            link: link.url.to_string(),
            document_id: document.id.clone(),
        })
    }

    /// A lost write only means the next read refreshes again.
    async fn persist_link(&self, document_id: &str, link: &str, expires_at: DateTime<Utc>) {
        match self
            .catalog
            .update_document_link(document_id, link, expires_at, self.config.write_timeout)
            .await
        {
            Ok(0) => warn!(document_id, "refreshed link not persisted; document row is gone"),
            Ok(_) => debug!(document_id, link_expiry = %expires_at, "refreshed link persisted"),
            Err(err) => warn!(document_id, error = %err, "failed to persist refreshed link"),
        }
    }
}
