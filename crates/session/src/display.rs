//! Live display state and render sink

use chrono::{DateTime, Utc};
use object_detection::DetectedObject;
use posture::{ClassificationResult, Label};
use serde::Serialize;
use tracing::debug;

/// What the presentation layer shows
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisplayState {
    /// Last posture that cleared the confidence threshold
    pub current_behavior: Option<Label>,
    /// Raw result of the last posture tick
    pub last_posture: Option<ClassificationResult>,
    /// Objects from the last detection tick, detector order
    pub detections: Vec<DetectedObject>,
    /// Size of the frame the detections refer to
    pub frame_size: Option<(u32, u32)>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sink for labelled boxes and the behaviour label. Never feeds back.
pub trait RenderSurface: Send + Sync {
    /// Replace the drawn boxes
    fn draw_detections(&self, frame_size: (u32, u32), detections: &[DetectedObject]);

    /// Show the current behaviour
    fn show_behavior(&self, label: Label);
}

/// Surface that writes to the debug log
#[derive(Debug, Default)]
pub struct TracingSurface;

impl RenderSurface for TracingSurface {
    fn draw_detections(&self, frame_size: (u32, u32), detections: &[DetectedObject]) {
        for object in detections {
            let [x, y, w, h] = object.bbox;
            debug!(
                "[{}x{}] {} at ({:.0}, {:.0}) {:.0}x{:.0}",
                frame_size.0,
                frame_size.1,
                object.caption(),
                x,
                y,
                w,
                h
            );
        }
    }

    fn show_behavior(&self, label: Label) {
        debug!("{} detected", label.describe());
    }
}
