//! Live video source

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::{CameraError, VideoFrame};

/// A video feed the monitor can sample from.
pub trait VideoSource: Send + Sync {
    /// Fails when the device cannot deliver frames at all.
    fn ensure_available(&self) -> Result<(), CameraError>;

    /// Frame dimensions, or `None` until the feed has produced a frame.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Most recent frame.
    fn current_frame(&self) -> Option<Arc<VideoFrame>>;

    fn is_ready(&self) -> bool {
        self.dimensions().is_some()
    }
}

/// Source that holds whatever frame was pushed last.
///
/// A webcam client (browser, capture daemon) pushes frames as they arrive;
/// samplers read the latest one without blocking the producer.
pub struct LatestFrameSource {
    latest: RwLock<Option<Arc<VideoFrame>>>,
    connected: AtomicBool,
    sequence: AtomicU32,
}

impl LatestFrameSource {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
            connected: AtomicBool::new(true),
            sequence: AtomicU32::new(0),
        }
    }

    /// Replace the current frame
    pub fn push_frame(&self, mut frame: VideoFrame) -> Result<u32, CameraError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(CameraError::Unavailable("video source disconnected".into()));
        }
        if frame.is_empty() {
            return Err(CameraError::NotReady);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        frame.sequence = sequence;

        match self.latest.write() {
            Ok(mut slot) => *slot = Some(Arc::new(frame)),
            Err(e) => {
                warn!("Frame slot poisoned: {}", e);
                return Err(CameraError::Unavailable(e.to_string()));
            }
        }
        debug!("Accepted frame #{}", sequence);
        Ok(sequence)
    }

    /// Decode and push a JPEG frame
    pub fn push_jpeg(&self, bytes: &[u8]) -> Result<u32, CameraError> {
        self.push_frame(VideoFrame::from_jpeg(bytes)?)
    }

    /// Mark the device as gone and drop the last frame
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        if let Ok(mut slot) = self.latest.write() {
            *slot = None;
        }
        warn!("Video source disconnected");
    }

    /// Number of frames accepted so far
    pub fn frames_received(&self) -> u32 {
        self.sequence.load(Ordering::Acquire)
    }
}

impl Default for LatestFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for LatestFrameSource {
    fn ensure_available(&self) -> Result<(), CameraError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CameraError::Unavailable("video source disconnected".into()))
        }
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.latest.read().ok()?.as_ref().map(|f| f.dimensions())
    }

    fn current_frame(&self) -> Option<Arc<VideoFrame>> {
        self.latest.read().ok()?.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_until_first_frame() {
        let source = LatestFrameSource::new();
        assert!(source.ensure_available().is_ok());
        assert!(!source.is_ready());
        assert!(source.current_frame().is_none());

        source.push_frame(VideoFrame::filled(4, 3, [0, 0, 0])).unwrap();
        assert!(source.is_ready());
        assert_eq!(source.dimensions(), Some((4, 3)));
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let source = LatestFrameSource::new();
        assert_eq!(source.push_frame(VideoFrame::filled(2, 2, [1, 1, 1])).unwrap(), 1);
        assert_eq!(source.push_frame(VideoFrame::filled(2, 2, [2, 2, 2])).unwrap(), 2);
        assert_eq!(source.current_frame().unwrap().sequence, 2);
        assert_eq!(source.frames_received(), 2);
    }

    #[test]
    fn test_disconnect_makes_source_unavailable() {
        let source = LatestFrameSource::new();
        source.push_frame(VideoFrame::filled(2, 2, [1, 1, 1])).unwrap();
        source.disconnect();

        assert!(matches!(source.ensure_available(), Err(CameraError::Unavailable(_))));
        assert!(!source.is_ready());
        assert!(source.push_frame(VideoFrame::filled(2, 2, [1, 1, 1])).is_err());
    }

    #[test]
    fn test_empty_frame_rejected() {
        let source = LatestFrameSource::new();
        let empty = VideoFrame::filled(0, 0, [0, 0, 0]);
        assert_eq!(source.push_frame(empty), Err(CameraError::NotReady));
    }
}
