use std::sync::Arc;

use common::{
    storage::{catalog::CatalogStore, db::SurrealDbClient, store::StorageManager},
    utils::config::AppConfig,
};
use ingestion_pipeline::{IngestionConfig, IngestionPipeline};
use retrieval_pipeline::{FreshnessConfig, LinkResolver};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub catalog: Arc<dyn CatalogStore>,
    pub config: AppConfig,
    pub storage: StorageManager,
    pub ingestion: Arc<IngestionPipeline>,
    pub resolver: Arc<LinkResolver>,
}

impl ApiState {
    pub async fn new(
        config: &AppConfig,
        storage: StorageManager,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let surreal_db_client = Arc::new(
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        );

        surreal_db_client.ensure_initialized().await?;

        Ok(Self::with_resources(surreal_db_client, config, storage))
    }

    /// Wires the pipelines around an already connected database.
    pub fn with_resources(
        db: Arc<SurrealDbClient>,
        config: &AppConfig,
        storage: StorageManager,
    ) -> Self {
        let catalog: Arc<dyn CatalogStore> = db.clone();
        let blobs = Arc::new(storage.clone());

        let ingestion = Arc::new(IngestionPipeline::new(
            Arc::clone(&catalog),
            blobs.clone(),
            IngestionConfig::from(config),
        ));
        let resolver = Arc::new(LinkResolver::new(
            Arc::clone(&catalog),
            blobs,
            FreshnessConfig::from(config),
        ));

        Self {
            db,
            catalog,
            config: config.clone(),
            storage,
            ingestion,
            resolver,
        }
    }
}
