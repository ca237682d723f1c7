//! k-nearest-neighbour classifier over labelled embeddings

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::{ClassificationResult, ClassifierDataset, Label, PostureError};

/// Label scores for one embedding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Label with the most neighbour votes
    pub label: Label,
    /// Vote share per trained label (sums to 1.0)
    pub confidences: BTreeMap<Label, f32>,
}

impl Prediction {
    /// Confidence of the winning label
    pub fn confidence(&self) -> f32 {
        self.confidences.get(&self.label).copied().unwrap_or(0.0)
    }

    /// Collapse to the top label
    pub fn top(&self) -> ClassificationResult {
        ClassificationResult::new(self.label, self.confidence())
    }
}

/// Classifier that learns from labelled embedding vectors.
pub trait NearestNeighborClassifier: Send + Sync {
    /// Add one labelled example
    fn add_example(&mut self, embedding: Vec<f32>, label: Label) -> Result<(), PostureError>;

    /// Score an embedding against every trained label
    fn predict_class(&self, embedding: &[f32]) -> Result<Prediction, PostureError>;

    /// Copy of the active example set
    fn dataset(&self) -> ClassifierDataset;

    /// Replace the active example set
    fn set_dataset(&mut self, dataset: ClassifierDataset);

    /// Examples stored for `label`
    fn example_count(&self, label: Label) -> usize;
}

/// Cosine-similarity kNN with majority vote
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    dataset: ClassifierDataset,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            dataset: ClassifierDataset::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new(3)
    }
}

impl NearestNeighborClassifier for KnnClassifier {
    fn add_example(&mut self, embedding: Vec<f32>, label: Label) -> Result<(), PostureError> {
        self.dataset.insert(label, embedding)
    }

    fn predict_class(&self, embedding: &[f32]) -> Result<Prediction, PostureError> {
        let expected = self.dataset.dimension().ok_or(PostureError::EmptyClassifier)?;
        if expected != embedding.len() {
            return Err(PostureError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        let mut scored: Vec<(f32, Label)> = self
            .dataset
            .iter()
            .flat_map(|(label, vectors)| {
                vectors
                    .iter()
                    .map(move |v| (cosine_similarity(embedding, v), label))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let k = self.k.min(scored.len());
        let mut votes: BTreeMap<Label, usize> =
            self.dataset.labels().into_iter().map(|l| (l, 0)).collect();
        for (_, label) in &scored[..k] {
            *votes.entry(*label).or_default() += 1;
        }

        // Ties go to the label whose best neighbour ranked highest
        let rank = |label: Label| scored.iter().position(|(_, l)| *l == label).unwrap_or(usize::MAX);
        let label = votes
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| rank(*b.0).cmp(&rank(*a.0))))
            .map(|(l, _)| *l)
            .ok_or(PostureError::EmptyClassifier)?;

        let confidences = votes
            .into_iter()
            .map(|(l, n)| (l, n as f32 / k as f32))
            .collect();

        let prediction = Prediction { label, confidences };
        debug!("kNN prediction: {} ({:.2})", prediction.label, prediction.confidence());
        Ok(prediction)
    }

    fn dataset(&self) -> ClassifierDataset {
        self.dataset.clone()
    }

    fn set_dataset(&mut self, dataset: ClassifierDataset) {
        self.dataset = dataset;
    }

    fn example_count(&self, label: Label) -> usize {
        self.dataset.example_count(label)
    }
}

/// Compute cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}
