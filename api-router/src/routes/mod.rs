use uuid::Uuid;

use crate::error::ApiError;

pub mod blobs;
pub mod collections;
pub mod documents;
pub mod liveness;
pub mod readiness;

/// Identifiers that are not UUIDs cannot name anything, so they read as missing.
fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{what} not found")))
}
