use common::{
    error::AppError,
    storage::{
        blob::{ObjectMetadata, StorageError},
        types::document::Document,
    },
};
use state_machines::core::GuardError;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    context::IngestContext,
    state::{Admitted, IngestionMachine, Linked, Ready, Registered, Uploaded},
};

#[instrument(
    level = "trace",
    skip_all,
    fields(collection_id = %ctx.collection_id)
)]
pub async fn admit(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut IngestContext<'_>,
) -> Result<IngestionMachine<(), Admitted>, AppError> {
    if ctx.file_name.trim().is_empty() {
        return Err(AppError::Validation("file name must be provided".into()));
    }

    if !ctx.guard.exists(ctx.collection_id).await {
        return Err(AppError::NotFound("collection not found".into()));
    }

    let document_id = Uuid::new_v4();
    ctx.document_id = Some(document_id);

    debug!(
        collection_id = %ctx.collection_id,
        %document_id,
        "document admitted"
    );

    machine
        .admit()
        .map_err(|(_, guard)| map_guard_error("admit", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(collection_id = %ctx.collection_id, document_id = ?ctx.document_id)
)]
pub async fn upload(
    machine: IngestionMachine<(), Admitted>,
    ctx: &mut IngestContext<'_>,
) -> Result<IngestionMachine<(), Uploaded>, AppError> {
    let document_id = ctx.document_id()?;
    let body = ctx.take_body()?;
    let metadata = ObjectMetadata::for_file_name(&ctx.file_name);

    let written = ctx
        .blobs
        .put_object(
            &document_id.to_string(),
            &metadata,
            ctx.declared_size,
            body,
            ctx.config.write_timeout,
        )
        .await
        .map_err(map_storage_error)?;
    ctx.bytes_written = written;

    debug!(
        %document_id,
        bytes = written,
        content_type = %metadata.content_type,
        "document object stored"
    );

    machine
        .upload()
        .map_err(|(_, guard)| map_guard_error("upload", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(collection_id = %ctx.collection_id, document_id = ?ctx.document_id)
)]
pub async fn issue_link(
    machine: IngestionMachine<(), Uploaded>,
    ctx: &mut IngestContext<'_>,
) -> Result<IngestionMachine<(), Linked>, AppError> {
    let document_id = ctx.document_id()?;

    // The object is already durable; failing here leaves it unreferenced, never half-registered.
    let link = ctx
        .blobs
        .presign_get(
            &document_id.to_string(),
            ctx.config.link_ttl,
            &ctx.file_name,
            ctx.config.lookup_timeout,
        )
        .await?;

    debug!(
        %document_id,
        link_expiry = %link.expires_at,
        "access link issued"
    );

    ctx.link = Some(link);

    machine
        .link()
        .map_err(|(_, guard)| map_guard_error("link", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(collection_id = %ctx.collection_id, document_id = ?ctx.document_id)
)]
pub async fn register(
    machine: IngestionMachine<(), Linked>,
    ctx: &mut IngestContext<'_>,
) -> Result<IngestionMachine<(), Registered>, AppError> {
    let document_id = ctx.document_id()?;
    let link = ctx.take_link()?;
    let document = Document::new(
        document_id,
        ctx.file_name.clone(),
        ctx.collection_id,
        &link,
    );

    let rows = ctx
        .catalog
        .insert_document(&document, ctx.config.write_timeout)
        .await?;
    if rows == 0 {
        return Err(AppError::NotFound("document could not be registered".into()));
    }

    debug!(%document_id, "document registered");

    machine
        .register()
        .map_err(|(_, guard)| map_guard_error("register", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}

/// A short or oversized body is the caller's mistake; everything else is the store's.
fn map_storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::SizeMismatch { declared, actual } => AppError::Validation(format!(
            "declared size {declared} does not match the {actual} bytes received"
        )),
        other => AppError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_is_a_validation_error() {
        let err = map_storage_error(StorageError::SizeMismatch {
            declared: 10,
            actual: 4,
        });
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("10") && msg.contains('4')));
    }

    #[test]
    fn backend_failures_stay_storage_errors() {
        let err = map_storage_error(StorageError::Timeout {
            operation: "put_object",
            timeout: std::time::Duration::from_secs(10),
        });
        assert!(matches!(err, AppError::Storage(StorageError::Timeout { .. })));
    }
}
