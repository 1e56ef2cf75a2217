use thiserror::Error;
use tokio::task::JoinError;

use crate::storage::{blob::StorageError, catalog::CatalogError};

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}
