use std::{sync::Arc, time::Duration};

use common::storage::catalog::{CatalogError, CatalogStore};
use tracing::{debug, warn};
use uuid::Uuid;

/// Gates document admission on the owning collection being present in the catalog.
///
/// Any doubt is resolved as absence: lookup errors and timeouts answer `false`.
#[derive(Clone)]
pub struct CollectionGuard {
    catalog: Arc<dyn CatalogStore>,
    lookup_timeout: Duration,
}

impl CollectionGuard {
    pub fn new(catalog: Arc<dyn CatalogStore>, lookup_timeout: Duration) -> Self {
        Self {
            catalog,
            lookup_timeout,
        }
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn exists(&self, collection_id: Uuid) -> bool {
        match self
            .catalog
            .find_collection(collection_id, self.lookup_timeout)
            .await
        {
            Ok(_) => true,
            Err(CatalogError::NotFound) => {
                debug!(%collection_id, "collection not found");
                false
            }
            Err(err) => {
                warn!(%collection_id, error = %err, "collection lookup failed; treating as absent");
                false
            }
        }
    }
}
