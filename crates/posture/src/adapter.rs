//! Posture classifier adapter

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use camera_capture::VideoFrame;
use tracing::{debug, info, warn};

use crate::{
    ClassificationResult, ClassifierDataset, EmbeddingFunction, Label, NearestNeighborClassifier,
    PostureError, Prediction,
};

/// Embedding function and nearest-neighbour classifier behind one call.
///
/// Returns the raw top label and its confidence; thresholding is the
/// caller's policy.
pub struct PostureClassifier {
    embedder: Arc<dyn EmbeddingFunction>,
    classifier: RwLock<Box<dyn NearestNeighborClassifier>>,
}

impl PostureClassifier {
    pub fn new(
        embedder: Arc<dyn EmbeddingFunction>,
        classifier: impl NearestNeighborClassifier + 'static,
    ) -> Self {
        info!(
            "Creating posture classifier ({}-dim embeddings)",
            embedder.dimension()
        );
        Self {
            embedder,
            classifier: RwLock::new(Box::new(classifier)),
        }
    }

    /// Classify a frame
    pub async fn classify(&self, frame: &VideoFrame) -> Result<ClassificationResult, PostureError> {
        let embedding = self.embedder.embed(frame).await?;
        let prediction = self.read()?.predict_class(&embedding)?;
        Ok(prediction.top())
    }

    /// Score a precomputed embedding against every trained label
    pub fn predict_embedding(&self, embedding: &[f32]) -> Result<Prediction, PostureError> {
        self.read()?.predict_class(embedding)
    }

    /// Embed a frame and store it as an example of `label`.
    /// Returns the number of examples now held for `label`.
    pub async fn add_example(&self, frame: &VideoFrame, label: Label) -> Result<usize, PostureError> {
        let embedding = self.embedder.embed(frame).await?;
        let mut classifier = self.write()?;
        classifier.add_example(embedding, label)?;
        let count = classifier.example_count(label);
        debug!("Stored example {} for {}", count, label);
        Ok(count)
    }

    /// Whether any examples are loaded
    pub fn has_dataset(&self) -> bool {
        self.read().map(|c| !c.dataset().is_empty()).unwrap_or(false)
    }

    /// Labels with at least one example
    pub fn trained_labels(&self) -> Vec<Label> {
        self.read().map(|c| c.dataset().labels()).unwrap_or_default()
    }

    /// Copy of the active dataset
    pub fn dataset(&self) -> Result<ClassifierDataset, PostureError> {
        Ok(self.read()?.dataset())
    }

    /// Replace the active dataset wholesale.
    ///
    /// A dataset built for another embedder is rejected and the active one kept.
    pub fn set_dataset(&self, dataset: ClassifierDataset) -> Result<(), PostureError> {
        let expected = self.embedder.dimension();
        if let Some(actual) = dataset.dimension().filter(|&d| d != expected) {
            warn!("Rejected dataset of {}-dim embeddings, expected {}", actual, expected);
            return Err(PostureError::DimensionMismatch { expected, actual });
        }
        info!(
            "Replacing classifier dataset ({} labels, {} examples)",
            dataset.labels().len(),
            dataset.total_examples()
        );
        self.write()?.set_dataset(dataset);
        Ok(())
    }

    /// Drop every example
    pub fn clear(&self) -> Result<(), PostureError> {
        self.set_dataset(ClassifierDataset::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Box<dyn NearestNeighborClassifier>>, PostureError> {
        self.classifier
            .read()
            .map_err(|e| PostureError::Inference(format!("classifier lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Box<dyn NearestNeighborClassifier>>, PostureError> {
        self.classifier
            .write()
            .map_err(|e| PostureError::Inference(format!("classifier lock poisoned: {}", e)))
    }
}
