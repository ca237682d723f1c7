//! Posture Classification
//!
//! Turns a sampled frame into a posture label with a confidence:
//! - Fixed label set for exam-room behaviour
//! - Embedding function seam (thumbnail embedding built in)
//! - k-nearest-neighbour classifier over labelled examples
//! - The labelled example set as a dataset value

pub mod adapter;
pub mod dataset;
pub mod embedding;
pub mod knn;
pub mod label;

pub use adapter::PostureClassifier;
pub use dataset::ClassifierDataset;
pub use embedding::{EmbeddingFunction, ThumbnailEmbedding};
pub use knn::{KnnClassifier, NearestNeighborClassifier, Prediction};
pub use label::{ClassificationResult, Label};

use thiserror::Error;

/// Posture classification errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostureError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Classifier has no examples")]
    EmptyClassifier,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown posture label: {0}")]
    UnknownLabel(String),
}
