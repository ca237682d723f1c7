//! Labelled example set

use std::collections::BTreeMap;

use crate::{Label, PostureError};

/// Embedding vectors grouped by label.
///
/// Every vector in the dataset has the same dimensionality; the first
/// inserted vector fixes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierDataset {
    examples: BTreeMap<Label, Vec<Vec<f32>>>,
    dimension: Option<usize>,
}

impl ClassifierDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from per-label vectors, rejecting mixed dimensions.
    /// Labels mapped to an empty list are dropped.
    pub fn from_examples(
        examples: impl IntoIterator<Item = (Label, Vec<Vec<f32>>)>,
    ) -> Result<Self, PostureError> {
        let mut dataset = Self::new();
        for (label, vectors) in examples {
            for vector in vectors {
                dataset.insert(label, vector)?;
            }
        }
        Ok(dataset)
    }

    /// Append one example
    pub fn insert(&mut self, label: Label, embedding: Vec<f32>) -> Result<(), PostureError> {
        match self.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(PostureError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            None => self.dimension = Some(embedding.len()),
            _ => {}
        }
        self.examples.entry(label).or_default().push(embedding);
        Ok(())
    }

    /// Vector length shared by every example
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Labels with at least one example
    pub fn labels(&self) -> Vec<Label> {
        self.examples.keys().copied().collect()
    }

    /// Examples recorded for `label`
    pub fn examples(&self, label: Label) -> &[Vec<f32>] {
        self.examples.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn example_count(&self, label: Label) -> usize {
        self.examples(label).len()
    }

    pub fn total_examples(&self) -> usize {
        self.examples.values().map(Vec::len).sum()
    }

    /// Iterate labels with their examples, in label order
    pub fn iter(&self) -> impl Iterator<Item = (Label, &[Vec<f32>])> {
        self.examples.iter().map(|(l, v)| (*l, v.as_slice()))
    }
}
