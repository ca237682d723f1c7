//! Model Store
//!
//! Saves the classifier's labelled examples as a label-keyed JSON
//! document of numeric arrays and restores them, plus a file-backed
//! export/import target.

mod document;
mod export;

pub use document::{load, save, DatasetDocument};
pub use export::{DocumentStore, FsDocumentStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Malformed dataset: {0}")]
    MalformedDataset(String),
    #[error("Dataset contains no labels")]
    EmptyDataset,
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
