use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{
    db::SurrealDbClient,
    types::{collection::Collection, document::Document},
};

/// Failure classes of the catalog, decided once at the database boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("record not found")]
    NotFound,
    #[error("catalog operation `{operation}` timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("catalog error: {0}")]
    Other(String),
}

impl From<surrealdb::Error> for CatalogError {
    fn from(err: surrealdb::Error) -> Self {
        use surrealdb::error::Db;

        match &err {
            surrealdb::Error::Db(Db::RecordExists { .. } | Db::IndexExists { .. }) => {
                Self::ConstraintViolation(err.to_string())
            }
            // Remote engines only hand back the rendered message.
            surrealdb::Error::Api(_) if err.to_string().contains("already exists") => {
                Self::ConstraintViolation(err.to_string())
            }
            _ => Self::Other(err.to_string()),
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_collection(&self, id: Uuid, timeout: Duration)
        -> Result<Collection, CatalogError>;

    /// Rows come back in whatever order the catalog yields them; callers must not rely on it
    /// being stable.
    async fn documents_in_collection(
        &self,
        collection_id: Uuid,
        timeout: Duration,
    ) -> Result<Vec<Document>, CatalogError>;

    /// Returns the number of rows written.
    async fn insert_collection(
        &self,
        collection: &Collection,
        timeout: Duration,
    ) -> Result<u64, CatalogError>;

    /// Returns the number of rows written.
    async fn insert_document(&self, document: &Document, timeout: Duration)
        -> Result<u64, CatalogError>;

    /// Replaces the stored link and its expiry. Returns the number of rows touched.
    async fn update_document_link(
        &self,
        document_id: &str,
        link: &str,
        link_expiry: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<u64, CatalogError>;
}

async fn with_timeout<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, CatalogError>
where
    F: Future<Output = Result<T, surrealdb::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(CatalogError::from),
        Err(_) => Err(CatalogError::Timeout { operation, timeout }),
    }
}

#[async_trait]
impl CatalogStore for SurrealDbClient {
    async fn find_collection(
        &self,
        id: Uuid,
        timeout: Duration,
    ) -> Result<Collection, CatalogError> {
        with_timeout(
            "find_collection",
            timeout,
            self.get_item::<Collection>(&id.to_string()),
        )
        .await?
        .ok_or(CatalogError::NotFound)
    }

    async fn documents_in_collection(
        &self,
        collection_id: Uuid,
        timeout: Duration,
    ) -> Result<Vec<Document>, CatalogError> {
        with_timeout("documents_in_collection", timeout, async {
            let mut response = self
                .query("SELECT * FROM document WHERE collection_id = $collection_id")
                .bind(("collection_id", collection_id.to_string()))
                .await?;
            response.take::<Vec<Document>>(0)
        })
        .await
    }

    async fn insert_collection(
        &self,
        collection: &Collection,
        timeout: Duration,
    ) -> Result<u64, CatalogError> {
        let stored = with_timeout(
            "insert_collection",
            timeout,
            self.store_item(collection.clone()),
        )
        .await?;
        Ok(u64::from(stored.is_some()))
    }

    async fn insert_document(
        &self,
        document: &Document,
        timeout: Duration,
    ) -> Result<u64, CatalogError> {
        let stored =
            with_timeout("insert_document", timeout, self.store_item(document.clone())).await?;
        Ok(u64::from(stored.is_some()))
    }

    async fn update_document_link(
        &self,
        document_id: &str,
        link: &str,
        link_expiry: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<u64, CatalogError> {
        let updated = with_timeout("update_document_link", timeout, async {
            let mut response = self
                .query(
                    "UPDATE type::thing('document', $id)
                     SET link = $link, link_expiry = $link_expiry, updated_at = $updated_at
                     RETURN AFTER",
                )
                .bind(("id", document_id.to_owned()))
                .bind(("link", link.to_owned()))
                .bind(("link_expiry", surrealdb::sql::Datetime::from(link_expiry)))
                .bind(("updated_at", surrealdb::sql::Datetime::from(Utc::now())))
                .await?;
            response.take::<Vec<Document>>(0)
        })
        .await?;
        Ok(u64::try_from(updated.len()).unwrap_or(u64::MAX))
    }
}
