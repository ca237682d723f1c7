//! Object detector seam and adapter

use async_trait::async_trait;
use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::DetectionError;

/// Detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class name, e.g. "person" or "cell phone"
    pub class: String,

    /// Detection score (0.0 to 1.0)
    pub score: f32,

    /// Bounding box [x, y, width, height] in pixels of the sampled frame
    pub bbox: [f32; 4],
}

impl DetectedObject {
    pub fn new(class: impl Into<String>, score: f32, bbox: [f32; 4]) -> Self {
        Self {
            class: class.into(),
            score,
            bbox,
        }
    }

    /// Display caption, e.g. "cell phone (87%)"
    pub fn caption(&self) -> String {
        format!("{} ({}%)", self.class, (self.score * 100.0).round() as i32)
    }
}

/// Detector model
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detect objects in frame, in the model's output order
    async fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError>;
}

/// Detector used when no model is configured; never reports objects
#[derive(Debug, Default)]
pub struct NullDetector;

impl NullDetector {
    pub fn new() -> Self {
        warn!("No object detection model configured. Phone detection is disabled.");
        Self
    }
}

#[async_trait]
impl ObjectDetector for NullDetector {
    async fn detect(&self, _frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        Ok(Vec::new())
    }
}

/// Adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Keep at most this many objects per frame (detector order preserved)
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { max_detections: 20 }
    }
}

/// Object detector behind one `detect(frame)` call
pub struct ObjectDetectorAdapter {
    detector: Arc<dyn ObjectDetector>,
    config: DetectorConfig,
}

impl ObjectDetectorAdapter {
    pub fn new(detector: Arc<dyn ObjectDetector>, config: DetectorConfig) -> Self {
        info!("Creating object detector adapter: max_detections={}", config.max_detections);
        Self { detector, config }
    }

    /// Detect objects in frame
    pub async fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        if frame.is_empty() {
            return Err(DetectionError::InvalidFrame);
        }

        let start = Instant::now();
        let mut objects = self.detector.detect(frame).await?;
        objects.truncate(self.config.max_detections);

        debug!(
            "Detected {} objects in frame #{} ({}ms)",
            objects.len(),
            frame.sequence,
            start.elapsed().as_millis()
        );
        Ok(objects)
    }
}
