#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod guard;
pub mod pipeline;

pub use guard::CollectionGuard;
pub use pipeline::{IngestionConfig, IngestionPipeline, IngestionRequest};
