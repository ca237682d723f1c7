//! Object Detection
//!
//! Wraps an object detector (COCO-style class names) behind one
//! `detect(frame)` call used by the detection sampler.

mod detector;

pub use detector::{DetectedObject, DetectorConfig, NullDetector, ObjectDetector, ObjectDetectorAdapter};

use thiserror::Error;

/// Detection error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame format")]
    InvalidFrame,
}
