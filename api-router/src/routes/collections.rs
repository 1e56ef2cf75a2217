use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::{
    error::AppError,
    storage::{catalog::CatalogError, types::collection::Collection},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::parse_id;
use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCollectionParams {
    pub name: String,
}

pub async fn create_collection(
    State(state): State<ApiState>,
    payload: Result<Json<CreateCollectionParams>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(params) = payload.map_err(|rejection| ApiError::ValidationError(rejection.body_text()))?;

    let collection = Collection::new(&params.name)?;
    let rows = state
        .catalog
        .insert_collection(&collection, state.config.write_timeout())
        .await
        .map_err(AppError::from)?;
    if rows == 0 {
        return Err(ApiError::NotFound("collection could not be created".into()));
    }

    info!(collection_id = %collection.id, "collection created");

    Ok((StatusCode::CREATED, Json(json!({ "id": collection.id }))))
}

pub async fn get_collection(
    State(state): State<ApiState>,
    Path(collection_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let collection_id = parse_id(&collection_id, "collection")?;

    let collection = state
        .catalog
        .find_collection(collection_id, state.config.lookup_timeout())
        .await
        .map_err(|err| match err {
            CatalogError::NotFound => ApiError::NotFound("collection not found".into()),
            other => AppError::from(other).into(),
        })?;

    Ok(Json(json!({ "data": collection })))
}
