//! Scripted collaborators for session tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alerting::{AlertConfig, TimedCuePlayer};
use async_trait::async_trait;
use camera_capture::{LatestFrameSource, VideoFrame};
use object_detection::{
    DetectedObject, DetectionError, DetectorConfig, ObjectDetector, ObjectDetectorAdapter,
};
use posture::{EmbeddingFunction, KnnClassifier, Label, PostureClassifier, PostureError};
use session::{Collaborators, ProctorSession, RenderSurface, SessionConfig};

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

/// Embeds a frame as the colour of its top-left pixel
#[derive(Default)]
pub struct ColorEmbedding {
    pub fail: AtomicBool,
}

#[async_trait]
impl EmbeddingFunction for ColorEmbedding {
    async fn embed(&self, frame: &VideoFrame) -> Result<Vec<f32>, PostureError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PostureError::Inference("model crashed".into()));
        }
        let [r, g, b] = frame
            .get_pixel(0, 0)
            .ok_or_else(|| PostureError::Inference("empty frame".into()))?;
        Ok(vec![r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
    }

    fn dimension(&self) -> usize {
        3
    }
}

/// Detector that returns whatever the test scripted, after a delay
#[derive(Default)]
pub struct ScriptedDetector {
    pub objects: Mutex<Vec<DetectedObject>>,
    pub delay: Mutex<Duration>,
    pub fail: AtomicBool,
}

impl ScriptedDetector {
    pub fn set_objects(&self, objects: Vec<DetectedObject>) {
        *self.objects.lock().unwrap() = objects;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl ObjectDetector for ScriptedDetector {
    async fn detect(&self, _frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DetectionError::Inference("detector crashed".into()));
        }
        Ok(self.objects.lock().unwrap().clone())
    }
}

/// Surface that remembers what it was asked to draw
#[derive(Default)]
pub struct RecordingSurface {
    pub behaviors: Mutex<Vec<Label>>,
    pub frames_drawn: Mutex<usize>,
}

impl RenderSurface for RecordingSurface {
    fn draw_detections(&self, _frame_size: (u32, u32), _detections: &[DetectedObject]) {
        *self.frames_drawn.lock().unwrap() += 1;
    }

    fn show_behavior(&self, label: Label) {
        self.behaviors.lock().unwrap().push(label);
    }
}

pub struct Harness {
    pub session: ProctorSession,
    pub video: Arc<LatestFrameSource>,
    pub embedding: Arc<ColorEmbedding>,
    pub classifier: Arc<PostureClassifier>,
    pub detector: Arc<ScriptedDetector>,
    pub player: Arc<TimedCuePlayer>,
    pub surface: Arc<RecordingSurface>,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        let video = Arc::new(LatestFrameSource::new());
        let embedding = Arc::new(ColorEmbedding::default());
        let classifier = Arc::new(PostureClassifier::new(embedding.clone(), KnnClassifier::new(3)));
        let detector = Arc::new(ScriptedDetector::default());
        let player = Arc::new(TimedCuePlayer::new(Duration::from_millis(3000)));
        let surface = Arc::new(RecordingSurface::default());

        let session = ProctorSession::new(
            config,
            AlertConfig::default(),
            Collaborators {
                video: video.clone(),
                classifier: classifier.clone(),
                detector: Arc::new(ObjectDetectorAdapter::new(
                    detector.clone(),
                    DetectorConfig::default(),
                )),
                player: player.clone(),
                surface: surface.clone(),
            },
        );

        Self {
            session,
            video,
            embedding,
            classifier,
            detector,
            player,
            surface,
        }
    }

    /// Make `rgb` the current camera frame
    pub fn show(&self, rgb: [u8; 3]) {
        self.video.push_frame(VideoFrame::filled(8, 6, rgb)).unwrap();
    }

    /// Train `label` from frames of colour `rgb`
    pub async fn train(&self, label: Label, rgb: [u8; 3]) {
        self.show(rgb);
        self.session.train(label).await.unwrap();
    }

    /// Red for normal posture, blue for absent, green for head left
    pub async fn train_all(&self) {
        self.train(Label::NormalPosture, RED).await;
        self.train(Label::Absent, BLUE).await;
        self.train(Label::HeadLeft, GREEN).await;
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        training_examples: 5,
        training_interval_ms: 10,
        required_labels: vec![Label::NormalPosture, Label::Absent],
        ..SessionConfig::default()
    }
}
