use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use common::{
    error::AppError,
    storage::blob::{content_disposition, guess_mime_type, StorageError},
};
use serde::Deserialize;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SignedLinkParams {
    pub expires: i64,
    pub filename: String,
    pub signature: String,
}

/// Streams an object addressed by a locally signed link.
pub async fn serve_blob(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Query(params): Query<SignedLinkParams>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .storage
        .verify_local_link(&key, params.expires, &params.filename, &params.signature)
        .map_err(AppError::from)?;

    let stream = state
        .storage
        .get_stream(&key)
        .await
        .map_err(|err| AppError::from(StorageError::from(err)))?;
    let body = Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&guess_mime_type(std::path::Path::new(&params.filename)))
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&params.filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-store"),
    );

    Ok((StatusCode::OK, headers, body))
}
