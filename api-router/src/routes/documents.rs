use std::{io::Seek, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use common::error::AppError;
use futures::StreamExt;
use ingestion_pipeline::IngestionRequest;
use serde_json::json;
use tempfile::NamedTempFile;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::parse_id;
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    // The request body limit layer bounds the upload size.
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

pub async fn upload_document(
    State(state): State<ApiState>,
    Path(collection_id): Path<String>,
    upload: Result<TypedMultipart<UploadParams>, TypedMultipartError>,
) -> Result<impl IntoResponse, ApiError> {
    let collection_id = parse_id(&collection_id, "collection")?;
    let TypedMultipart(input) = upload?;
    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("file name must be provided".into()))?;

    let (mut file, temp_path) = input.file.contents.into_parts();
    let declared_size = file.metadata().map_err(AppError::from)?.len();
    file.rewind().map_err(AppError::from)?;

    info!(
        %collection_id,
        file_name = %file_name,
        declared_size,
        "Received document upload"
    );

    let request = IngestionRequest {
        collection_id,
        file_name: file_name.clone(),
        declared_size,
        body: ReaderStream::new(tokio::fs::File::from_std(file)).boxed(),
    };

    // Detached from the connection: a client hanging up must not cut store calls short.
    let pipeline = Arc::clone(&state.ingestion);
    let handle = tokio::spawn(async move {
        let result = pipeline.ingest(request).await;
        drop(temp_path);
        result
    });
    let document_id = handle.await.map_err(AppError::from)??;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "document_id": document_id,
            "filename": file_name,
        })),
    ))
}

pub async fn list_documents(
    State(state): State<ApiState>,
    Path(collection_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let collection_id = parse_id(&collection_id, "collection")?;

    let documents = state.resolver.list_fresh_documents(collection_id).await?;

    Ok(Json(json!({ "documents": documents })))
}
